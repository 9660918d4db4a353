//! Reverse geolocation driven by position updates.

use tracing::{debug, error, info};

use crate::client::ApiClient;
use crate::config::GeolocationConfig;
use crate::error::ApiError;
use crate::geolocation::{GeolocationQuery, GeolocationResponse, LocationInfo};
use crate::location::{LocationUpdates, Position};
use crate::transport::Transport;

/// Turns each new position into one reverse lookup.
#[derive(Debug)]
pub struct GeolocationTracker<T> {
    client: ApiClient<T>,
    config: GeolocationConfig,
    last: Option<Position>,
}

impl<T: Transport + 'static> GeolocationTracker<T> {
    pub fn new(client: ApiClient<T>, config: GeolocationConfig) -> Self {
        Self {
            client,
            config,
            last: None,
        }
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last
    }

    /// Whether `position` is treated as unchanged and skipped.
    ///
    /// Each coordinate is compared on its own: an update is skipped when
    /// *either* the latitude or the longitude equals the last one, so moving
    /// along a meridian or a parallel is not looked up.
    pub fn is_unchanged(&self, position: &Position) -> bool {
        match &self.last {
            Some(last) => {
                position.latitude == last.latitude || position.longitude == last.longitude
            }
            None => false,
        }
    }

    /// Look up `position` unless it is unchanged. `Ok(None)` means skipped.
    pub async fn handle(&mut self, position: Position) -> Result<Option<Vec<LocationInfo>>, ApiError> {
        if self.is_unchanged(&position) {
            debug!(?position, "position unchanged, skipping lookup");
            return Ok(None);
        }
        self.last = Some(position);

        let endpoint =
            GeolocationQuery::reverse(position.latitude, position.longitude).endpoint(&self.config);
        let response: GeolocationResponse = self.client.send(&endpoint).await?;
        let results: Vec<LocationInfo> = response
            .data
            .iter()
            .map(|place| {
                LocationInfo::from_place(place, position.latitude, position.longitude, position.altitude)
            })
            .collect();
        info!(count = results.len(), "reverse geolocation result");
        Ok(Some(results))
    }

    /// Consume `updates` until the sequence ends, passing each lookup result to `on_result`.
    ///
    /// Update and lookup errors are logged and do not stop the loop. Returns
    /// the number of lookups performed.
    pub async fn run<F>(&mut self, updates: &mut LocationUpdates, mut on_result: F) -> usize
    where
        F: FnMut(&Position, Vec<LocationInfo>),
    {
        let mut lookups = 0;
        while let Some(update) = updates.next().await {
            let position = match update {
                Ok(position) => position,
                Err(e) => {
                    error!(error = %e, "location update error");
                    continue;
                }
            };
            match self.handle(position).await {
                Ok(Some(results)) => {
                    lookups += 1;
                    on_result(&position, results);
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "reverse geolocation failed"),
            }
        }
        lookups
    }
}
