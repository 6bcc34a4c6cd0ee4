use chrono::{Datelike, NaiveDate};

use crate::store::{Error, Trip};

const PARTICIPANT_PREFIX: &str = "participant.";

/// A trip participant. `age` is a manually entered fallback for rosters
/// where the birth date is unknown.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Participant {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl Participant {
    /// Age in whole years on `today`.
    ///
    /// Computed from the birth date when present (one less if the birthday
    /// has not yet occurred this year), otherwise the stored fallback age.
    #[must_use]
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let Some(birth) = self.birth_date else {
            return self.age;
        };
        let mut age = today.year() - birth.year();
        let had_birthday = (today.month(), today.day()) >= (birth.month(), birth.day());
        if !had_birthday {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

fn record_key(id: &str) -> String {
    format!("{PARTICIPANT_PREFIX}{id}")
}

/// Read the full roster, in stored (key) order.
#[must_use]
pub fn entries(trip: &Trip) -> Vec<Participant> {
    trip.list_by_prefix::<Participant>(PARTICIPANT_PREFIX)
        .into_iter()
        .map(|(_, participant)| participant)
        .collect()
}

/// Add a participant with a fresh id.
pub fn add(trip: &Trip, full_name: &str) -> exn::Result<Participant, Error> {
    let participant = Participant {
        id: ulid::Ulid::new().to_string(),
        full_name: full_name.to_owned(),
        display_name: None,
        email: None,
        phone: None,
        birth_date: None,
        age: None,
    };
    trip.set(&record_key(&participant.id), &participant)?;
    Ok(participant)
}

/// Overwrite a participant record.
pub fn update(trip: &Trip, participant: &Participant) -> exn::Result<(), Error> {
    trip.set(&record_key(&participant.id), participant)
}

/// Remove a participant record.
pub fn remove(trip: &Trip, id: &str) -> exn::Result<(), Error> {
    trip.delete(&record_key(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(birth_date: Option<NaiveDate>, age: Option<u32>) -> Participant {
        Participant {
            id: "01".into(),
            full_name: "Kari Nordmann".into(),
            display_name: None,
            email: None,
            phone: None,
            birth_date,
            age,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_after_birthday_this_year() {
        let p = participant(Some(date(1990, 3, 14)), None);
        assert_eq!(p.age_on(date(2026, 8, 23)), Some(36));
    }

    #[test]
    fn age_before_birthday_this_year() {
        let p = participant(Some(date(1990, 11, 2)), None);
        assert_eq!(p.age_on(date(2026, 8, 23)), Some(35));
    }

    #[test]
    fn age_on_the_birthday_itself() {
        let p = participant(Some(date(1990, 8, 23)), None);
        assert_eq!(p.age_on(date(2026, 8, 23)), Some(36));
    }

    #[test]
    fn fallback_age_without_birth_date() {
        let p = participant(None, Some(41));
        assert_eq!(p.age_on(date(2026, 8, 23)), Some(41));
    }

    #[test]
    fn no_birth_date_and_no_fallback() {
        let p = participant(None, None);
        assert_eq!(p.age_on(date(2026, 8, 23)), None);
    }

    #[test]
    fn roster_round_trip() {
        let trip = Trip::ephemeral();
        let mut p = add(&trip, "Kari Nordmann").unwrap();
        p.birth_date = Some(date(1990, 3, 14));
        update(&trip, &p).unwrap();

        let roster = entries(&trip);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].birth_date, Some(date(1990, 3, 14)));
    }
}
