// 🏠 Address provider
//
// Draws a real street segment inside the original postal code and a house
// number valid for that segment. When the original number is itself valid the
// replacement stays close to it, so the magnitude of the number is preserved.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, ScrubError};
use crate::postcode::{format_postal_code, PostcodeEntry, PostcodeLookup};
use crate::providers::SyntheticValueProvider;

/// How far a preserved house number may drift from the original
const NUMBER_DRIFT: i64 = 10;

/// Share of addresses that get a unit suffix
const UNIT_PROBABILITY: f64 = 0.1;
const UNITS: &[&str] = &["A", "B", "C", "1", "2"];

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRequest {
    pub address_id: i64,
    pub postal_code: Option<String>,
    pub street_number: Option<i64>,
}

/// A consistent (street, number, city, postal code, coordinates) tuple
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAddress {
    pub street_address: String,
    pub street_name: String,
    pub street_number: i64,
    pub street_unit: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub struct AddressProvider<'a> {
    lookup: &'a dyn PostcodeLookup,
}

impl<'a> AddressProvider<'a> {
    pub fn new(lookup: &'a dyn PostcodeLookup) -> Self {
        AddressProvider { lookup }
    }

    pub fn address<R: Rng>(&self, rng: &mut R, request: &AddressRequest) -> Result<SyntheticAddress> {
        let missing = || ScrubError::NoAddressData {
            address_id: request.address_id,
            postal_code: request.postal_code.clone().unwrap_or_default(),
        };

        let postal_code = request
            .postal_code
            .as_deref()
            .filter(|pc| !pc.trim().is_empty())
            .ok_or_else(missing)?;

        let entries: Vec<PostcodeEntry> = self
            .lookup
            .entries_for(postal_code)?
            .into_iter()
            .filter(|e| e.is_usable())
            .collect();

        // Prefer segments on which the original number is valid
        let original = request.street_number;
        let matching: Vec<&PostcodeEntry> = match original {
            Some(n) => entries.iter().filter(|e| e.contains(n)).collect(),
            None => Vec::new(),
        };

        let (entry, number) = match (matching.choose(rng), original) {
            (Some(entry), Some(n)) => {
                let drifted = rng.gen_range(n - NUMBER_DRIFT..=n + NUMBER_DRIFT);
                (*entry, entry.snap(drifted))
            }
            _ => {
                let entry = entries.choose(rng).ok_or_else(missing)?;
                let drawn = rng.gen_range(entry.number_from..=entry.number_to);
                (entry, entry.snap(drawn))
            }
        };

        let street_unit = if rng.gen_bool(UNIT_PROBABILITY) {
            UNITS.choose(rng).copied().unwrap_or_default().to_string()
        } else {
            String::new()
        };

        Ok(SyntheticAddress {
            street_address: street_address(&entry.street, number, &street_unit),
            street_name: entry.street.clone(),
            street_number: number,
            street_unit,
            city: entry.city.clone(),
            postal_code: format_postal_code(&entry.postcode),
            latitude: entry.latitude,
            longitude: entry.longitude,
        })
    }
}

impl SyntheticValueProvider for AddressProvider<'_> {
    type Request = AddressRequest;
    type Value = SyntheticAddress;

    fn generate<R: Rng>(&self, rng: &mut R, request: &AddressRequest) -> Result<SyntheticAddress> {
        self.address(rng, request)
    }
}

/// "Kerkstraat 12", "Kerkstraat 12A", "Kerkstraat 12-2"
fn street_address(street: &str, number: i64, unit: &str) -> String {
    match unit.chars().next() {
        None => format!("{} {}", street, number),
        Some(c) if c.is_ascii_digit() => format!("{} {}-{}", street, number, unit),
        Some(_) => format!("{} {}{}", street, number, unit),
    }
}
