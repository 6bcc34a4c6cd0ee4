use std::fmt::Write as _;
use std::time::Duration;

use isahc::prelude::*;
use isahc::Request;

use super::{GeocodeResult, Geocoder};

const SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const USER_AGENT: &str = "Utur/0.3";
const MAX_RESULTS: usize = 1;

/// Nominatim (OpenStreetMap) forward geocoding.
///
/// The usage policy caps unauthenticated clients at roughly one request per
/// second; callers are expected to pace themselves (see the batch runner).
#[derive(Clone, Copy, Default)]
pub struct Backend;

impl Backend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Geocoder for Backend {
    fn search(
        &self,
        query: String,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<GeocodeResult>, String>> + Send + '_>,
    > {
        Box::pin(search(query))
    }
}

#[derive(serde::Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
}

async fn search(query: String) -> Result<Vec<GeocodeResult>, String> {
    let encoded = percent_encode(&query);
    let url = format!("{SEARCH_URL}?format=json&q={encoded}&limit={MAX_RESULTS}");

    let request = Request::get(&url)
        .timeout(Duration::from_secs(15))
        .header("User-Agent", USER_AGENT)
        .header("Accept-Language", "no,en")
        .body(())
        .map_err(|e| e.to_string())?;

    let client = isahc::HttpClient::new().map_err(|e| e.to_string())?;
    let mut response = client
        .send_async(request)
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("nominatim returned status {}", response.status()));
    }

    let body = response.text().await.map_err(|e| e.to_string())?;
    let results: Vec<SearchResult> = serde_json::from_str(&body)
        .map_err(|e| format!("failed to parse geocoding response: {e}"))?;

    results
        .into_iter()
        .take(MAX_RESULTS)
        .map(|r| {
            let lat = r
                .lat
                .parse::<f64>()
                .map_err(|e| format!("invalid lat: {e}"))?;
            let lon = r
                .lon
                .parse::<f64>()
                .map_err(|e| format!("invalid lon: {e}"))?;
            Ok(GeocodeResult {
                lat,
                lon,
                display_name: r.display_name,
            })
        })
        .collect()
}

/// Percent-encode a string for use in a URL query parameter.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
