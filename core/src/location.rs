//! Position updates as a cancelable asynchronous sequence.
//!
//! # Design
//! A position source is any `Stream` of raw fixes. `LocationManager` spawns
//! one producer task per `start_updates` call that forwards fixes into a
//! bounded channel; the consumer reads them through `LocationUpdates`.
//! Each start bumps a generation counter and the producer checks that it
//! still owns the current generation before every yield, so `stop_updates`
//! (or a restart) ends the previous sequence and closes its channel.

use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::{LocationError, ParsePositionError};

const UPDATE_BUFFER: usize = 16;

/// A device position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    /// Parse `lat,lon` or `lat,lon,alt`. Altitude defaults to `0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| ParsePositionError {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(fail("expected lat,lon[,alt]"));
        }
        let number = |part: &str, name: &str| {
            part.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| fail(&format!("{name} is not a number")))
        };
        let latitude = number(parts[0], "latitude")?;
        let longitude = number(parts[1], "longitude")?;
        let altitude = match parts.get(2) {
            Some(part) => number(part, "altitude")?,
            None => 0.0,
        };
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(fail("latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(fail("longitude out of range"));
        }
        Ok(Position::new(latitude, longitude, altitude))
    }
}

/// One raw fix from a position source. `Ok(None)` means no fix was available.
pub type RawFix = io::Result<Option<Position>>;

/// Starts and stops position update sequences.
#[derive(Debug, Clone, Default)]
pub struct LocationManager {
    generation: Arc<AtomicU64>,
    active: Arc<AtomicU64>,
}

impl LocationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start forwarding fixes from `source`. Must be called inside a tokio runtime.
    ///
    /// A previous sequence from this manager ends before its next yield.
    pub fn start_updates<S>(&self, source: S) -> LocationUpdates
    where
        S: Stream<Item = RawFix> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.active.store(generation, Ordering::Release);
        info!(generation, "starting location updates");

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            let mut source = Box::pin(source);
            while let Some(fix) = source.next().await {
                if active.load(Ordering::Acquire) != generation {
                    break;
                }
                match fix {
                    Ok(Some(position)) => {
                        info!(
                            latitude = position.latitude,
                            longitude = position.longitude,
                            altitude = position.altitude,
                            "new device location"
                        );
                        if tx.send(Ok(position)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send(Err(LocationError::LocationNotFound)).await;
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "location updates could not start");
                        let _ = tx.send(Err(LocationError::UpdatesCouldNotStart(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        LocationUpdates { rx }
    }

    pub fn stop_updates(&self) {
        info!("stopping location updates");
        // Zero is never a live generation.
        self.active.store(0, Ordering::Release);
    }

    pub fn is_updating(&self) -> bool {
        self.active.load(Ordering::Acquire) != 0
    }
}

/// Consumer side of a position update sequence.
#[derive(Debug)]
pub struct LocationUpdates {
    rx: mpsc::Receiver<Result<Position, LocationError>>,
}

impl LocationUpdates {
    /// Wait for the next update. `None` once the sequence has ended.
    pub async fn next(&mut self) -> Option<Result<Position, LocationError>> {
        self.rx.recv().await
    }
}

impl Stream for LocationUpdates {
    type Item = Result<Position, LocationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn fixes(positions: &[(f64, f64)]) -> Vec<RawFix> {
        positions
            .iter()
            .map(|&(lat, lon)| Ok(Some(Position::new(lat, lon, 0.0))))
            .collect()
    }

    #[test]
    fn parses_position_text() {
        assert_eq!(
            "42.161434, -8.619662".parse::<Position>().unwrap(),
            Position::new(42.161434, -8.619662, 0.0)
        );
        assert_eq!(
            "42.1,-8.6,35.5".parse::<Position>().unwrap(),
            Position::new(42.1, -8.6, 35.5)
        );
    }

    #[test]
    fn rejects_malformed_position_text() {
        for input in ["", "42.1", "a,b", "1,2,3,4", "91,0", "0,181", "NaN,0"] {
            assert!(input.parse::<Position>().is_err(), "{input:?}");
        }
    }

    #[tokio::test]
    async fn forwards_every_fix_then_ends() {
        let manager = LocationManager::new();
        let mut updates = manager.start_updates(stream::iter(fixes(&[(1.0, 2.0), (3.0, 4.0)])));

        assert_eq!(updates.next().await, Some(Ok(Position::new(1.0, 2.0, 0.0))));
        assert_eq!(updates.next().await, Some(Ok(Position::new(3.0, 4.0, 0.0))));
        assert_eq!(updates.next().await, None);
    }

    #[tokio::test]
    async fn missing_fix_yields_not_found_and_ends() {
        let manager = LocationManager::new();
        let source = stream::iter(vec![
            Ok(Some(Position::new(1.0, 2.0, 0.0))),
            Ok(None),
            Ok(Some(Position::new(5.0, 6.0, 0.0))),
        ]);
        let updates: Vec<_> = manager.start_updates(source).collect().await;
        assert_eq!(
            updates,
            vec![
                Ok(Position::new(1.0, 2.0, 0.0)),
                Err(LocationError::LocationNotFound),
            ]
        );
    }

    #[tokio::test]
    async fn source_error_yields_could_not_start_and_ends() {
        let manager = LocationManager::new();
        let source = stream::iter(vec![
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(Some(Position::new(5.0, 6.0, 0.0))),
        ]);
        let updates: Vec<_> = manager.start_updates(source).collect().await;
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], Err(LocationError::UpdatesCouldNotStart(_))));
    }

    #[tokio::test]
    async fn stop_ends_the_sequence_before_the_next_yield() {
        let manager = LocationManager::new();
        let (tx, rx) = mpsc::unbounded_channel::<RawFix>();
        let source = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|fix| (fix, rx))
        });
        let mut updates = manager.start_updates(source);

        tx.send(Ok(Some(Position::new(1.0, 1.0, 0.0)))).unwrap();
        assert_eq!(updates.next().await, Some(Ok(Position::new(1.0, 1.0, 0.0))));
        assert!(manager.is_updating());

        manager.stop_updates();
        assert!(!manager.is_updating());
        tx.send(Ok(Some(Position::new(2.0, 2.0, 0.0)))).unwrap();
        assert_eq!(updates.next().await, None);
    }

    #[tokio::test]
    async fn restart_ends_the_previous_sequence() {
        let manager = LocationManager::new();
        let (tx, rx) = mpsc::unbounded_channel::<RawFix>();
        let source = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|fix| (fix, rx))
        });
        let mut first = manager.start_updates(source);
        let mut second = manager.start_updates(stream::iter(fixes(&[(7.0, 8.0)])));

        tx.send(Ok(Some(Position::new(1.0, 1.0, 0.0)))).unwrap();
        assert_eq!(first.next().await, None);
        assert_eq!(second.next().await, Some(Ok(Position::new(7.0, 8.0, 0.0))));
    }
}
