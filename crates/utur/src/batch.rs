use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use utur_trip::places::TripPlace;

use crate::geocoding::cache::Storage;
use crate::geocoding::{GeocodeResult, PlaceQuery, Resolver};

/// Pause between consecutive lookups. Nominatim tolerates roughly one
/// request per second, so the batch is strictly serialized around this.
pub const REQUEST_DELAY: Duration = Duration::from_millis(1100);

/// How a batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Cooperative cancellation flag, checked at every suspension point of the
/// batch loop. Cancelling does not abort an in-flight request, it only stops
/// further work; results already accumulated are kept.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The lookup query for a stored place.
#[must_use]
pub fn query_for(place: &TripPlace) -> PlaceQuery {
    PlaceQuery {
        name: place.name.clone(),
        country: place.country.clone(),
    }
}

/// Places that still need a lookup: both coordinates absent, a derivable
/// key, and that key not already in `resolved`.
fn pending<'a>(
    places: &'a [TripPlace],
    resolved: &HashMap<String, GeocodeResult>,
) -> Vec<&'a TripPlace> {
    places
        .iter()
        .filter(|place| place.missing_coordinates())
        .filter(|place| {
            query_for(place)
                .key()
                .is_some_and(|key| !resolved.contains_key(&key))
        })
        .collect()
}

/// Resolve every place still missing coordinates, one lookup at a time.
///
/// Requests go out strictly in input order with `delay` between consecutive
/// items, none after the last. Places whose key is already in `resolved` are
/// skipped up front, which makes re-running over the same input idempotent:
/// a fully resolved input issues zero lookups.
///
/// The token is checked before each resolution and before each delay. On
/// cancellation the remaining queue is abandoned; everything accumulated so
/// far is still returned and nothing is rolled back.
///
/// Returns the accumulated key → result map so the caller can merge it into
/// its own view in a single update.
pub async fn run<S: Storage>(
    places: &[TripPlace],
    resolved: &HashMap<String, GeocodeResult>,
    resolver: &Resolver<S>,
    delay: Duration,
    token: &CancelToken,
) -> (HashMap<String, GeocodeResult>, Outcome) {
    let queue = pending(places, resolved);
    let mut results: HashMap<String, GeocodeResult> = HashMap::new();

    for (index, place) in queue.iter().enumerate() {
        if token.is_cancelled() {
            tracing::debug!(
                resolved = results.len(),
                remaining = queue.len() - index,
                "batch cancelled"
            );
            return (results, Outcome::Cancelled);
        }

        let query = query_for(place);
        let Some(key) = query.key() else {
            continue;
        };
        // Duplicate key within this batch, already answered.
        if results.contains_key(&key) {
            continue;
        }

        match resolver.resolve(&query).await {
            Some(found) => {
                tracing::debug!(place = %key, lat = found.lat, lon = found.lon, "resolved");
                results.insert(key, found);
            }
            None => {
                tracing::debug!(place = %key, "no match, left unresolved");
            }
        }

        if index + 1 < queue.len() {
            if token.is_cancelled() {
                return (results, Outcome::Cancelled);
            }
            async_io::Timer::after(delay).await;
        }
    }

    (results, Outcome::Completed)
}
