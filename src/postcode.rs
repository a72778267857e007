// 🗺️ Reference postal geography
//
// Maps a postal code to the real street segments it covers: street name,
// city, valid house-number range and coordinates. Replacement addresses are
// only ever drawn from here, so street, city and postal code always agree.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

// ============================================================================
// ENTRY
// ============================================================================

/// Which house numbers a range admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumberParity {
    Even,
    Odd,
    #[default]
    Mixed,
}

impl NumberParity {
    pub fn admits(&self, number: i64) -> bool {
        match self {
            NumberParity::Even => number % 2 == 0,
            NumberParity::Odd => number % 2 != 0,
            NumberParity::Mixed => true,
        }
    }
}

/// One street segment within a postal code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostcodeEntry {
    pub postcode: String,
    pub street: String,
    pub city: String,
    pub number_from: i64,
    pub number_to: i64,
    pub parity: NumberParity,
    pub latitude: f64,
    pub longitude: f64,
}

/// CSV row shape; an empty parity column means mixed numbering
#[derive(Debug, Deserialize)]
struct CsvRow {
    postcode: String,
    street: String,
    city: String,
    number_from: i64,
    number_to: i64,
    parity: Option<NumberParity>,
    latitude: f64,
    longitude: f64,
}

impl From<CsvRow> for PostcodeEntry {
    fn from(row: CsvRow) -> Self {
        PostcodeEntry {
            postcode: row.postcode,
            street: row.street,
            city: row.city,
            number_from: row.number_from,
            number_to: row.number_to,
            parity: row.parity.unwrap_or_default(),
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

impl PostcodeEntry {
    /// Whether `number` is a valid house number on this segment
    pub fn contains(&self, number: i64) -> bool {
        number >= self.number_from && number <= self.number_to && self.parity.admits(number)
    }

    /// At least one house number satisfies range and parity
    pub fn is_usable(&self) -> bool {
        if self.number_from <= 0 || self.number_to < self.number_from {
            return false;
        }
        match self.parity {
            NumberParity::Mixed => true,
            _ => (self.number_from..=self.number_to.min(self.number_from + 1))
                .any(|n| self.parity.admits(n)),
        }
    }

    /// Nearest valid number to `n` inside the range
    pub fn snap(&self, n: i64) -> i64 {
        let n = n.clamp(self.number_from, self.number_to);
        if self.parity.admits(n) {
            n
        } else if n + 1 <= self.number_to {
            n + 1
        } else {
            n - 1
        }
    }
}

// ============================================================================
// POSTAL CODE FORMAT
// ============================================================================

/// Lookup key: uppercase with all whitespace removed ("1234ab " -> "1234AB")
pub fn postal_code_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Canonical Dutch spelling "1234 AB"; other shapes are returned as keyed
pub fn format_postal_code(raw: &str) -> String {
    let key = postal_code_key(raw);
    let is_dutch = key.len() == 6
        && key.is_ascii()
        && key[..4].chars().all(|c| c.is_ascii_digit())
        && key[4..].chars().all(|c| c.is_ascii_uppercase());

    if is_dutch {
        format!("{} {}", &key[..4], &key[4..])
    } else {
        key
    }
}

// ============================================================================
// LOOKUP
// ============================================================================

/// Exact postal-code lookup into a reference dataset
pub trait PostcodeLookup {
    /// Usable entries for a postal code, in a stable order
    fn entries_for(&self, postal_code: &str) -> crate::error::Result<Vec<PostcodeEntry>>;
}

/// In-memory dataset, typically loaded from a CSV export
#[derive(Debug, Default, Clone)]
pub struct PostcodeTable {
    entries: BTreeMap<String, Vec<PostcodeEntry>>,
}

impl PostcodeTable {
    pub fn new() -> Self {
        PostcodeTable::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = PostcodeEntry>) -> Self {
        let mut table = PostcodeTable::new();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Load from a CSV file with header
    /// `postcode,street,city,number_from,number_to,parity,latitude,longitude`
    pub fn from_csv(csv_path: &Path) -> Result<Self> {
        let file = std::fs::File::open(csv_path)
            .with_context(|| format!("Failed to open postcode file: {:?}", csv_path))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut table = PostcodeTable::new();

        for result in rdr.deserialize() {
            let row: CsvRow = result.context("Failed to deserialize postcode entry")?;
            table.insert(row.into());
        }

        Ok(table)
    }

    /// Unusable ranges (no valid number) are dropped on insert
    pub fn insert(&mut self, entry: PostcodeEntry) {
        if !entry.is_usable() {
            return;
        }
        self.entries
            .entry(postal_code_key(&entry.postcode))
            .or_default()
            .push(entry);
    }

    pub fn postcode_count(&self) -> usize {
        self.entries.len()
    }
}

impl PostcodeLookup for PostcodeTable {
    fn entries_for(&self, postal_code: &str) -> crate::error::Result<Vec<PostcodeEntry>> {
        Ok(self
            .entries
            .get(&postal_code_key(postal_code))
            .cloned()
            .unwrap_or_default())
    }
}
