pub mod cache;
pub mod nominatim;

use std::future::Future;
use std::pin::Pin;

use cache::{Cache, Storage};

/// A free-text place lookup, optionally disambiguated by country
/// (e.g. "Paris", "Frankrike").
#[derive(Debug, Clone)]
pub struct PlaceQuery {
    pub name: String,
    pub country: Option<String>,
}

impl PlaceQuery {
    /// The composed query string, which doubles as the cache key.
    ///
    /// `None` when the name is empty after trimming; such a query is never
    /// sent anywhere. Two queries with the same key are the same lookup.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        match self.country.as_deref().map(str::trim) {
            Some(country) if !country.is_empty() => Some(format!("{name}, {country}")),
            _ => Some(name.to_owned()),
        }
    }
}

/// A geocoded location. Immutable once produced.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// A geocoding provider that resolves a query string to candidate locations,
/// best match first.
pub trait Geocoder: Send + Sync + 'static {
    fn search(
        &self,
        query: String,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<GeocodeResult>, String>> + Send + '_>>;
}

/// Cache-first place resolution.
///
/// The cache is an optimization, never a correctness requirement: with a
/// permanently failing [`Storage`] every call degrades to a provider lookup.
pub struct Resolver<S> {
    geocoder: Box<dyn Geocoder>,
    cache: Cache<S>,
}

impl<S: Storage> Resolver<S> {
    #[must_use]
    pub const fn new(geocoder: Box<dyn Geocoder>, cache: Cache<S>) -> Self {
        Self { geocoder, cache }
    }

    /// Resolve a place query to coordinates.
    ///
    /// Returns `None` for blank queries (no I/O at all), cache-misses the
    /// provider knows nothing about, and any provider or parse failure. The
    /// caller cannot distinguish "no match" from "service down". Never fails.
    pub async fn resolve(&self, query: &PlaceQuery) -> Option<GeocodeResult> {
        let key = query.key()?;

        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }

        let results = match self.geocoder.search(key.clone()).await {
            Ok(results) => results,
            Err(e) => {
                tracing::debug!(query = %key, error = %e, "geocoding lookup failed");
                return None;
            }
        };

        let best = results.into_iter().next()?;
        self.cache.put(&key, &best);
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures_lite::future::block_on;

    use super::cache::MemoryStorage;
    use super::*;

    /// Provider fake that records queries and replays canned responses.
    struct FakeGeocoder {
        responses: Mutex<Vec<Result<Vec<GeocodeResult>, String>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeGeocoder {
        fn new(
            responses: Vec<Result<Vec<GeocodeResult>, String>>,
        ) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let fake = Self {
                responses: Mutex::new(responses),
                calls: Arc::clone(&calls),
            };
            (fake, calls)
        }
    }

    impl Geocoder for FakeGeocoder {
        fn search(
            &self,
            query: String,
        ) -> std::pin::Pin<
            Box<dyn Future<Output = Result<Vec<GeocodeResult>, String>> + Send + '_>,
        > {
            self.calls.lock().unwrap().push(query);
            let mut responses = self.responses.lock().unwrap();
            let response = if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            };
            Box::pin(async move { response })
        }
    }

    fn paris() -> GeocodeResult {
        GeocodeResult {
            lat: 48.8566,
            lon: 2.3522,
            display_name: "Paris, France".into(),
        }
    }

    fn resolver(
        responses: Vec<Result<Vec<GeocodeResult>, String>>,
    ) -> (Resolver<Arc<MemoryStorage>>, Arc<Mutex<Vec<String>>>, Arc<MemoryStorage>) {
        let (fake, calls) = FakeGeocoder::new(responses);
        let storage = Arc::new(MemoryStorage::new());
        let r = Resolver::new(Box::new(fake), Cache::new(Arc::clone(&storage)));
        (r, calls, storage)
    }

    #[test]
    fn key_composes_name_and_country() {
        let query = PlaceQuery {
            name: " Paris ".into(),
            country: Some(" France ".into()),
        };
        assert_eq!(query.key().as_deref(), Some("Paris, France"));
    }

    #[test]
    fn key_without_country() {
        let query = PlaceQuery {
            name: "Oslo Lufthavn".into(),
            country: Some("   ".into()),
        };
        assert_eq!(query.key().as_deref(), Some("Oslo Lufthavn"));
    }

    #[test]
    fn blank_name_short_circuits() {
        let (r, calls, storage) = resolver(vec![Ok(vec![paris()])]);
        let query = PlaceQuery {
            name: "   ".into(),
            country: Some("France".into()),
        };
        assert_eq!(block_on(r.resolve(&query)), None);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(storage.snapshot(), None);
    }

    #[test]
    fn repeated_lookup_served_from_cache() {
        let (r, calls, _storage) = resolver(vec![Ok(vec![paris()])]);
        let query = PlaceQuery {
            name: "Paris".into(),
            country: Some("France".into()),
        };

        let first = block_on(r.resolve(&query));
        let second = block_on(r.resolve(&query));

        assert_eq!(first, Some(paris()));
        assert_eq!(second, first);
        // One provider call total; the second resolve was a cache hit.
        assert_eq!(calls.lock().unwrap().as_slice(), ["Paris, France"]);
    }

    #[test]
    fn no_match_is_none_and_caches_nothing() {
        let (r, calls, storage) = resolver(vec![Ok(Vec::new()), Ok(Vec::new())]);
        let query = PlaceQuery {
            name: "Atlantis".into(),
            country: None,
        };

        assert_eq!(block_on(r.resolve(&query)), None);
        assert_eq!(storage.snapshot(), None);

        // No negative caching: the next call asks the provider again.
        assert_eq!(block_on(r.resolve(&query)), None);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn provider_error_folds_to_none() {
        let (r, _calls, storage) = resolver(vec![Err("status 503".into())]);
        let query = PlaceQuery {
            name: "Paris".into(),
            country: None,
        };
        assert_eq!(block_on(r.resolve(&query)), None);
        assert_eq!(storage.snapshot(), None);
    }

    #[test]
    fn first_candidate_wins() {
        let other = GeocodeResult {
            lat: 33.66,
            lon: -95.55,
            display_name: "Paris, Texas".into(),
        };
        let (r, _calls, _storage) = resolver(vec![Ok(vec![paris(), other])]);
        let query = PlaceQuery {
            name: "Paris".into(),
            country: None,
        };
        assert_eq!(block_on(r.resolve(&query)), Some(paris()));
    }
}
