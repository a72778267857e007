// 👤 Person identity provider
//
// Gender is drawn first and selects the first-name table. Every derived
// field (display name, sort name, initials, greetings) is built from that one
// draw, so all columns written for a contact describe the same person.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{Locale, SortNameStyle};
use crate::error::{Result, ScrubError};
use crate::providers::names::{self, Surname};
use crate::providers::{Gender, SyntheticValueProvider};

/// Identity drawn for one contact record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticPerson {
    pub gender: Gender,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub sort_name: String,
    pub initials: String,
    pub greeting: String,
    pub addressee: String,
}

pub struct PersonProvider {
    locale: Locale,
    sort_style: SortNameStyle,
}

impl PersonProvider {
    pub fn new(locale: Locale, sort_style: SortNameStyle) -> Self {
        PersonProvider { locale, sort_style }
    }

    /// Draw a fresh identity
    pub fn person<R: Rng>(&self, rng: &mut R) -> Result<SyntheticPerson> {
        let gender = if rng.gen_bool(0.5) {
            Gender::Female
        } else {
            Gender::Male
        };

        let first_name = *names::first_names(self.locale, gender)
            .choose(rng)
            .ok_or_else(|| ScrubError::Config("empty first-name table".to_string()))?;
        let surname = *names::surnames(self.locale)
            .choose(rng)
            .ok_or_else(|| ScrubError::Config("empty surname table".to_string()))?;

        Ok(self.compose(gender, first_name, surname))
    }

    fn compose(&self, gender: Gender, first_name: &str, surname: Surname) -> SyntheticPerson {
        let last_name = surname.full();
        let initials = initials(self.locale, first_name);

        let sort_name = match self.sort_style {
            SortNameStyle::SurnamePrefixLast if surname.is_detachable() => {
                format!("{}, {} {}", surname.core, first_name, surname.prefix)
            }
            _ => format!("{}, {}", last_name, first_name),
        };

        let (greeting, addressee) = match self.locale {
            Locale::Dutch => (
                format!("Beste {}", first_name),
                format!("{} {}", initials, last_name),
            ),
            Locale::English => (
                format!("Dear {}", first_name),
                format!("{} {}", first_name, last_name),
            ),
        };

        SyntheticPerson {
            gender,
            first_name: first_name.to_string(),
            display_name: format!("{} {}", first_name, last_name),
            last_name,
            sort_name,
            initials,
            greeting,
            addressee,
        }
    }
}

impl SyntheticValueProvider for PersonProvider {
    type Request = ();
    type Value = SyntheticPerson;

    fn generate<R: Rng>(&self, rng: &mut R, _request: &()) -> Result<SyntheticPerson> {
        self.person(rng)
    }
}

/// Dutch letter clusters that are abbreviated as a unit ("Chr.", "Th.")
const DUTCH_CLUSTERS: &[&str] = &["IJ", "Chr", "Th", "Ph"];

/// Initials from the leading letter(s) of each part of a first name.
///
/// "Jan-Willem" gives "J.W.", and in Dutch "Christiaan" gives "Chr.".
pub fn initials(locale: Locale, first_name: &str) -> String {
    first_name
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let cluster = match locale {
                Locale::Dutch => DUTCH_CLUSTERS.iter().find(|c| part.starts_with(**c)).copied(),
                Locale::English => None,
            };
            match cluster {
                Some(cluster) => format!("{}.", cluster),
                None => part
                    .chars()
                    .next()
                    .map(|c| format!("{}.", c.to_uppercase()))
                    .unwrap_or_default(),
            }
        })
        .collect()
}
