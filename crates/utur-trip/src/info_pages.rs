use crate::store::{Error, Trip};

const PAGE_PREFIX: &str = "info_page.";

/// Well-known page slugs rendered by the app.
pub const NOTICEBOARD: &str = "noticeboard";
pub const TODAYS_PLANS: &str = "todays-plans";

/// A free-form info page addressed by slug.
///
/// Content is plain text; some pages (the day-plan overview) keep structured
/// JSON in it and parse it themselves on display.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InfoPage {
    pub slug: String,
    pub content: String,
}

fn record_key(slug: &str) -> String {
    format!("{PAGE_PREFIX}{slug}")
}

/// Read all pages, in stored (key) order.
#[must_use]
pub fn entries(trip: &Trip) -> Vec<InfoPage> {
    trip.list_by_prefix::<InfoPage>(PAGE_PREFIX)
        .into_iter()
        .map(|(_, page)| page)
        .collect()
}

/// Read one page by slug.
#[must_use]
pub fn get(trip: &Trip, slug: &str) -> Option<InfoPage> {
    trip.get(&record_key(slug))
}

/// Page content for display. A page that was never written is empty.
#[must_use]
pub fn content(trip: &Trip, slug: &str) -> String {
    get(trip, slug).map(|page| page.content).unwrap_or_default()
}

/// Create or overwrite the page at `slug`.
pub fn update(trip: &Trip, slug: &str, content: &str) -> exn::Result<(), Error> {
    let page = InfoPage {
        slug: slug.to_owned(),
        content: content.to_owned(),
    };
    trip.set(&record_key(slug), &page)
}
