use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use corenet_core::{
    ApiClient, ClientConfig, Endpoint, GeolocationConfig, GeolocationQuery, GeolocationResponse,
    GeolocationTracker, HttpScheme, LocationInfo, LocationManager, Position, RawFix,
};
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// geolookup: forward and reverse geolocation lookups
#[derive(Parser, Debug)]
#[command(name = "geolookup", version, about = "Forward and reverse geolocation lookups")]
struct Cli {
    /// Geocoding API host, optionally with :port
    #[arg(long)]
    host: Option<String>,

    /// URL scheme for the geocoding API
    #[arg(long, value_enum)]
    scheme: Option<SchemeArg>,

    /// API access key
    #[arg(long)]
    access_key: Option<String>,

    /// Serve lookups from fixture files instead of the network
    #[arg(long)]
    offline: bool,

    /// Directory holding fixture files
    #[arg(long)]
    fixture_dir: Option<PathBuf>,

    /// Print the request instead of sending it
    #[arg(short, long)]
    dry_run: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up coordinates for an address
    Forward { address: String },
    /// Look up addresses for coordinates
    Reverse {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Read `lat,lon[,alt]` lines from stdin and look up each new position
    Watch,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemeArg {
    Http,
    Https,
}

impl From<SchemeArg> for HttpScheme {
    fn from(scheme: SchemeArg) -> Self {
        match scheme {
            SchemeArg::Http => HttpScheme::Http,
            SchemeArg::Https => HttpScheme::Https,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut client_config = ClientConfig::from_env();
    if let Some(dir) = &cli.fixture_dir {
        client_config.fixture_dir = dir.clone();
    }
    let mut config = GeolocationConfig::from_env();
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(scheme) = cli.scheme {
        config.scheme = scheme.into();
    }
    if let Some(key) = &cli.access_key {
        config.access_key = key.clone();
    }
    config.offline |= cli.offline;

    let client = ApiClient::new(client_config);

    match cli.command {
        Command::Forward { address } => {
            let query = GeolocationQuery::Forward { address };
            lookup(&client, &query.endpoint(&config), cli.dry_run).await
        }
        Command::Reverse {
            latitude,
            longitude,
        } => {
            let query = GeolocationQuery::reverse(latitude, longitude);
            lookup(&client, &query.endpoint(&config), cli.dry_run).await
        }
        Command::Watch => watch(client, config).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn lookup(client: &ApiClient, endpoint: &Endpoint, dry_run: bool) -> Result<()> {
    if dry_run {
        let request = endpoint.to_request()?;
        println!("{} {}", request.method, request.url);
        for (name, value) in &request.headers {
            println!("{name}: {value}");
        }
        if let Some(body) = &request.body {
            println!();
            println!("{body}");
        }
        if let Some(fixture) = &endpoint.fixture {
            println!("# served from fixture {}", client.fixture_path(fixture).display());
        }
        return Ok(());
    }

    let response: GeolocationResponse = client
        .send(endpoint)
        .await
        .with_context(|| format!("lookup against {} failed", endpoint.host))?;
    if response.data.is_empty() {
        println!("no results");
    }
    for place in &response.data {
        print_info(&LocationInfo::from_place(place, place.latitude, place.longitude, 0.0));
    }
    Ok(())
}

async fn watch(client: ApiClient, config: GeolocationConfig) -> Result<()> {
    let manager = LocationManager::new();
    let mut updates = manager.start_updates(stdin_positions());
    let mut tracker = GeolocationTracker::new(client, config);

    let lookups = tracker
        .run(&mut updates, |position, results| {
            println!("# {}, {}", position.latitude, position.longitude);
            for info in &results {
                print_info(info);
            }
        })
        .await;
    manager.stop_updates();
    println!("# {lookups} lookups");
    Ok(())
}

/// Positions read from stdin, one per line. Blank lines are skipped and an
/// unparseable line counts as a missing fix.
fn stdin_positions() -> impl futures::Stream<Item = RawFix> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let fix = match line.parse::<Position>() {
                        Ok(position) => Some(position),
                        Err(e) => {
                            warn!(error = %e, "ignoring position");
                            None
                        }
                    };
                    return Some((Ok(fix), lines));
                }
                Ok(None) => return None,
                Err(e) => return Some((Err(e), lines)),
            }
        }
    })
}

fn print_info(info: &LocationInfo) {
    println!(
        "{} {}: {} [{}, {}, alt {}]",
        info.country_flag, info.country_name, info.address, info.latitude, info.longitude, info.altitude
    );
}
