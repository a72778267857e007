// ☎️ Phone number provider
//
// Dutch numbering: mobile numbers are "06-" plus eight digits, fixed lines
// are an area code plus a subscriber number that together make ten digits.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

use crate::error::{Result, ScrubError};
use crate::providers::SyntheticValueProvider;

/// Area codes with a seven-digit subscriber part
const SHORT_AREA_CODES: &[&str] = &[
    "010", "013", "015", "020", "023", "024", "026", "030", "033", "035", "036", "038",
    "040", "043", "045", "046", "050", "053", "055", "058", "070", "071", "072", "073",
    "074", "075", "076", "077", "078", "079",
];

/// Area codes with a six-digit subscriber part
const LONG_AREA_CODES: &[&str] = &[
    "0111", "0113", "0161", "0164", "0172", "0180", "0222", "0229", "0251", "0255", "0294",
    "0299", "0313", "0318", "0320", "0341", "0345", "0411", "0416", "0475", "0481", "0492",
    "0499", "0511", "0513", "0521", "0527", "0541", "0546", "0561", "0570", "0575", "0591",
    "0594", "0597", "0599",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Mobile,
    Fixed,
}

impl LineType {
    /// Whether `phone` is written in this line type's national format
    pub fn matches_format(&self, phone: &str) -> bool {
        let Some((prefix, subscriber)) = phone.split_once('-') else {
            return false;
        };
        let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(prefix) || !all_digits(subscriber) {
            return false;
        }

        match self {
            LineType::Mobile => prefix == "06" && subscriber.len() == 8,
            LineType::Fixed => {
                prefix != "06"
                    && prefix.starts_with('0')
                    && (prefix.len() == 3 || prefix.len() == 4)
                    && prefix.len() + subscriber.len() == 10
                    && !subscriber.starts_with(['0', '1'])
            }
        }
    }
}

/// Display form plus the digits-only form stored alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticPhone {
    pub phone: String,
    pub phone_numeric: String,
}

pub struct PhoneProvider {
    mobile_type_ids: BTreeSet<i64>,
}

impl PhoneProvider {
    pub fn new(mobile_type_ids: BTreeSet<i64>) -> Self {
        PhoneProvider { mobile_type_ids }
    }

    /// Line type for a stored phone_type_id; unknown and missing types are fixed lines
    pub fn line_type(&self, phone_type_id: Option<i64>) -> LineType {
        match phone_type_id {
            Some(id) if self.mobile_type_ids.contains(&id) => LineType::Mobile,
            _ => LineType::Fixed,
        }
    }

    pub fn phone<R: Rng>(&self, rng: &mut R, line_type: LineType) -> Result<SyntheticPhone> {
        let phone = match line_type {
            LineType::Mobile => format!("06-{}", subscriber_number(rng, 8)),
            LineType::Fixed => {
                let area = if rng.gen_bool(0.5) {
                    SHORT_AREA_CODES.choose(rng)
                } else {
                    LONG_AREA_CODES.choose(rng)
                }
                .ok_or_else(|| ScrubError::Config("empty area code table".to_string()))?;
                format!("{}-{}", area, subscriber_number(rng, 10 - area.len()))
            }
        };

        Ok(SyntheticPhone {
            phone_numeric: numeric(&phone),
            phone,
        })
    }
}

impl SyntheticValueProvider for PhoneProvider {
    type Request = LineType;
    type Value = SyntheticPhone;

    fn generate<R: Rng>(&self, rng: &mut R, line_type: &LineType) -> Result<SyntheticPhone> {
        self.phone(rng, *line_type)
    }
}

/// Subscriber part: never starts with 0 or 1
fn subscriber_number<R: Rng>(rng: &mut R, digits: usize) -> String {
    let mut number = String::with_capacity(digits);
    for i in 0..digits {
        let digit = if i == 0 { rng.gen_range(2..10) } else { rng.gen_range(0..10) };
        number.push_str(&digit.to_string());
    }
    number
}

/// Strip everything except ASCII digits
pub fn numeric(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn provider() -> PhoneProvider {
        PhoneProvider::new(BTreeSet::from([2]))
    }

    #[test]
    fn test_line_type_from_type_id() {
        let p = provider();
        assert_eq!(p.line_type(Some(2)), LineType::Mobile);
        assert_eq!(p.line_type(Some(1)), LineType::Fixed);
        assert_eq!(p.line_type(None), LineType::Fixed);
    }

    #[test]
    fn test_mobile_format() {
        let p = provider();
        let mut rng = StdRng::seed_from_u64(21);

        for _ in 0..500 {
            let phone = p.generate(&mut rng, &LineType::Mobile).unwrap();
            assert!(LineType::Mobile.matches_format(&phone.phone), "{}", phone.phone);
            assert!(!LineType::Fixed.matches_format(&phone.phone));
            assert_eq!(phone.phone_numeric, numeric(&phone.phone));
            assert_eq!(phone.phone_numeric.len(), 10);
        }
    }

    #[test]
    fn test_fixed_format() {
        let p = provider();
        let mut rng = StdRng::seed_from_u64(22);

        for _ in 0..500 {
            let phone = p.generate(&mut rng, &LineType::Fixed).unwrap();
            assert!(LineType::Fixed.matches_format(&phone.phone), "{}", phone.phone);
            assert!(!LineType::Mobile.matches_format(&phone.phone));
            assert_eq!(phone.phone_numeric, phone.phone.replace('-', ""));
            assert_eq!(phone.phone_numeric.len(), 10);
        }
    }

    #[test]
    fn test_matches_format_rejects_garbage() {
        assert!(!LineType::Mobile.matches_format("0612345678"));
        assert!(!LineType::Mobile.matches_format("06-1234567"));
        assert!(!LineType::Fixed.matches_format("020-0123456"));
        assert!(!LineType::Fixed.matches_format("020-12a4567"));
        assert!(LineType::Fixed.matches_format("0513-123456"));
    }

    #[test]
    fn test_numeric() {
        assert_eq!(numeric("+31 (0)20-123 4567"), "310201234567");
        assert_eq!(numeric(""), "");
    }
}
