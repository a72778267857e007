// Email provider: name-shaped local part on a reserved example domain,
// so a replacement address can never reach a real mailbox.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Locale;
use crate::error::{Result, ScrubError};
use crate::providers::names;
use crate::providers::{Gender, SyntheticValueProvider};

const SAFE_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

pub struct EmailProvider {
    locale: Locale,
}

impl EmailProvider {
    pub fn new(locale: Locale) -> Self {
        EmailProvider { locale }
    }

    pub fn email<R: Rng>(&self, rng: &mut R) -> Result<String> {
        let gender = if rng.gen_bool(0.5) { Gender::Female } else { Gender::Male };
        let empty = || ScrubError::Config("empty name table".to_string());

        let first = names::first_names(self.locale, gender).choose(rng).ok_or_else(empty)?;
        let last = names::surnames(self.locale).choose(rng).ok_or_else(empty)?;
        let domain = SAFE_DOMAINS.choose(rng).ok_or_else(empty)?;

        let local = match rng.gen_range(0..3) {
            0 => format!("{}.{}", slug(first), slug(&last.full())),
            1 => format!("{}{}", slug(first), rng.gen_range(1..100)),
            _ => format!("{}.{}{}", slug(first), slug(&last.full()), rng.gen_range(1..100)),
        };

        Ok(format!("{}@{}", local, domain))
    }
}

impl SyntheticValueProvider for EmailProvider {
    type Request = ();
    type Value = String;

    fn generate<R: Rng>(&self, rng: &mut R, _request: &()) -> Result<String> {
        self.email(rng)
    }
}

/// Lowercase ASCII letters and digits only
fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
