use crate::store::{Error, Trip};

const PLACE_PREFIX: &str = "place.";

/// A named location of interest to the trip, possibly lacking resolved
/// coordinates. Coordinates are filled in by the geocoding batch and written
/// back here; a place with both `lat` and `lon` absent is a resolution
/// candidate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TripPlace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_airport: bool,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl TripPlace {
    /// Whether this place still needs geocoding.
    #[must_use]
    pub const fn missing_coordinates(&self) -> bool {
        self.lat.is_none() && self.lon.is_none()
    }
}

/// Full record key for a place id.
fn record_key(id: &str) -> String {
    format!("{PLACE_PREFIX}{id}")
}

/// Read all places, in stored (key) order.
#[must_use]
pub fn entries(trip: &Trip) -> Vec<TripPlace> {
    trip.list_by_prefix::<TripPlace>(PLACE_PREFIX)
        .into_iter()
        .map(|(_, place)| place)
        .collect()
}

/// The places flagged as airports. Airports get their own marker on the map.
#[must_use]
pub fn airports(trip: &Trip) -> Vec<TripPlace> {
    entries(trip)
        .into_iter()
        .filter(|place| place.is_airport)
        .collect()
}

/// Add a new place with a fresh id and no coordinates.
pub fn add(trip: &Trip, name: &str, country: Option<&str>) -> exn::Result<TripPlace, Error> {
    let place = TripPlace {
        id: ulid::Ulid::new().to_string(),
        name: name.to_owned(),
        country: country.map(str::to_owned),
        notes: None,
        is_airport: false,
        lat: None,
        lon: None,
    };
    trip.set(&record_key(&place.id), &place)?;
    Ok(place)
}

/// Overwrite a place record.
pub fn update(trip: &Trip, place: &TripPlace) -> exn::Result<(), Error> {
    trip.set(&record_key(&place.id), place)
}

/// Remove a place record.
pub fn remove(trip: &Trip, id: &str) -> exn::Result<(), Error> {
    trip.delete(&record_key(id))
}

/// Write resolved coordinates back to a stored place.
///
/// The only mutation the resolution flow performs outside its own cache.
/// Unknown ids are ignored: the place may have been removed while the batch
/// was running.
pub fn set_coordinates(trip: &Trip, id: &str, lat: f64, lon: f64) -> exn::Result<(), Error> {
    let key = record_key(id);
    let Some(mut place) = trip.get::<TripPlace>(&key) else {
        tracing::debug!(id, "coordinate write-back for unknown place, skipped");
        return Ok(());
    };
    place.lat = Some(lat);
    place.lon = Some(lon);
    trip.set(&key, &place)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_list() {
        let trip = Trip::ephemeral();
        add(&trip, "Paris", Some("Frankrike")).unwrap();
        add(&trip, "Oslo Lufthavn", None).unwrap();

        let places = entries(&trip);
        assert_eq!(places.len(), 2);
        assert!(places.iter().all(TripPlace::missing_coordinates));
    }

    #[test]
    fn set_coordinates_updates_only_latlon() {
        let trip = Trip::ephemeral();
        let place = add(&trip, "Paris", Some("Frankrike")).unwrap();

        set_coordinates(&trip, &place.id, 48.8566, 2.3522).unwrap();

        let stored = entries(&trip).pop().unwrap();
        assert_eq!(stored.lat, Some(48.8566));
        assert_eq!(stored.lon, Some(2.3522));
        assert_eq!(stored.name, "Paris");
        assert_eq!(stored.country.as_deref(), Some("Frankrike"));
        assert!(!stored.missing_coordinates());
    }

    #[test]
    fn airport_flag_persists_and_filters() {
        let trip = Trip::ephemeral();
        let mut gardermoen = add(&trip, "Oslo Lufthavn", None).unwrap();
        gardermoen.is_airport = true;
        update(&trip, &gardermoen).unwrap();
        add(&trip, "Paris", Some("Frankrike")).unwrap();

        let flagged = airports(&trip);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].name, "Oslo Lufthavn");
        assert!(flagged[0].is_airport);
    }

    #[test]
    fn set_coordinates_on_removed_place_is_noop() {
        let trip = Trip::ephemeral();
        let place = add(&trip, "Paris", None).unwrap();
        remove(&trip, &place.id).unwrap();

        set_coordinates(&trip, &place.id, 1.0, 2.0).unwrap();
        assert!(entries(&trip).is_empty());
    }
}
