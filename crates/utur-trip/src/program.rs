use chrono::NaiveDate;

use crate::store::{Error, Trip};

const DAY_PREFIX: &str = "day.";

/// One line of a day's schedule.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleItem {
    #[serde(default)]
    pub time: Option<String>,
    pub title: String,
}

/// One day of the trip program. Days are displayed sorted by `sort_order`,
/// which the reorder operations keep dense.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Day {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
}

fn record_key(id: &str) -> String {
    format!("{DAY_PREFIX}{id}")
}

/// Read all days, sorted by `sort_order`.
#[must_use]
pub fn entries(trip: &Trip) -> Vec<Day> {
    let mut days: Vec<Day> = trip
        .list_by_prefix::<Day>(DAY_PREFIX)
        .into_iter()
        .map(|(_, day)| day)
        .collect();
    days.sort_by_key(|d| d.sort_order);
    days
}

/// Add a day at the end of the program.
pub fn add(trip: &Trip, title: &str) -> exn::Result<Day, Error> {
    let next_order = entries(trip).last().map_or(0, |d| d.sort_order + 1);
    let day = Day {
        id: ulid::Ulid::new().to_string(),
        title: title.to_owned(),
        date: None,
        sort_order: next_order,
        schedule: Vec::new(),
    };
    trip.set(&record_key(&day.id), &day)?;
    Ok(day)
}

/// Overwrite a day record.
pub fn update(trip: &Trip, day: &Day) -> exn::Result<(), Error> {
    trip.set(&record_key(&day.id), day)
}

/// Remove a day record.
pub fn remove(trip: &Trip, id: &str) -> exn::Result<(), Error> {
    trip.delete(&record_key(id))
}

/// Move one element of `items` from index `from` to index `to`, shifting the
/// elements in between. Out-of-range indices leave the list untouched.
pub fn reorder<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() || to >= items.len() || from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Drag-reorder the program days, renumbering `sort_order` densely and
/// persisting every day whose position changed.
pub fn reorder_days(trip: &Trip, from: usize, to: usize) -> exn::Result<(), Error> {
    let mut days = entries(trip);
    reorder(&mut days, from, to);
    for (index, day) in days.iter_mut().enumerate() {
        let order = u32::try_from(index).unwrap_or(u32::MAX);
        if day.sort_order != order {
            day.sort_order = order;
            update(trip, day)?;
        }
    }
    Ok(())
}

/// Drag-reorder the schedule lines within one day.
pub fn reorder_schedule(
    trip: &Trip,
    day_id: &str,
    from: usize,
    to: usize,
) -> exn::Result<(), Error> {
    let Some(mut day) = trip.get::<Day>(&record_key(day_id)) else {
        return Ok(());
    };
    reorder(&mut day.schedule, from, to);
    update(trip, &day)
}
