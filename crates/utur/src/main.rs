mod batch;
mod geocoding;
mod notify;

use std::collections::HashMap;

use macro_rules_attribute::apply;
use smol_macros::main;

use utur_trip::{places, Trip};

use crate::batch::{CancelToken, Outcome};
use crate::geocoding::cache::{Cache, FileStorage};
use crate::geocoding::{nominatim, Resolver};

#[apply(main!)]
async fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,isahc=error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = dirs::data_dir()
        .expect("could not determine data directory")
        .join("utur");
    let trip = Trip::open(&data_dir).expect("failed to open trip store");

    let cache_file = dirs::cache_dir()
        .expect("could not determine cache directory")
        .join("utur")
        .join("geocode-cache.json");
    let resolver = Resolver::new(
        Box::new(nominatim::Backend::new()),
        Cache::new(FileStorage::new(cache_file)),
    );

    let all = places::entries(&trip);
    let missing = all
        .iter()
        .filter(|place| place.missing_coordinates())
        .count();
    if missing == 0 {
        tracing::info!(places = all.len(), "all places already have coordinates");
        return;
    }
    tracing::info!(places = all.len(), missing, "resolving coordinates");

    let token = CancelToken::new();
    let (results, outcome) = batch::run(
        &all,
        &HashMap::new(),
        &resolver,
        batch::REQUEST_DELAY,
        &token,
    )
    .await;

    // Write resolved coordinates back. Failures are not retried here: the
    // place stays unresolved and re-enters the batch on the next run.
    let mut written = Vec::new();
    for place in all.iter().filter(|place| place.missing_coordinates()) {
        let Some(key) = batch::query_for(place).key() else {
            continue;
        };
        let Some(found) = results.get(&key) else {
            continue;
        };
        match places::set_coordinates(&trip, &place.id, found.lat, found.lon) {
            Ok(()) => written.push(place.name.clone()),
            Err(e) => tracing::warn!(name = %place.name, ?e, "coordinate write-back failed"),
        }
    }

    match outcome {
        Outcome::Completed => {
            tracing::info!(resolved = written.len(), missing, "batch completed");
        }
        Outcome::Cancelled => {
            tracing::info!(resolved = written.len(), missing, "batch cancelled");
        }
    }

    if written.is_empty() {
        return;
    }
    if let Some(notifier) = notify::Notifier::from_env() {
        if let Err(e) = notifier.send(&notify::resolved_summary(&written)).await {
            tracing::warn!(error = %e, "Telegram notification failed");
        }
    }
}
