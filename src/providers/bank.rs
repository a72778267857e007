// 🏦 Financial account provider
//
// Dutch IBANs: "NL" + two check digits + four-letter bank code + ten-digit
// account number. The BIC is always the one belonging to the drawn bank code.
// Format-valid only; no account is checked against a real bank.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, ScrubError};
use crate::providers::SyntheticValueProvider;

/// (bank code, BIC)
const BANKS: &[(&str, &str)] = &[
    ("ABNA", "ABNANL2A"),
    ("INGB", "INGBNL2A"),
    ("RABO", "RABONL2U"),
    ("SNSB", "SNSBNL2A"),
    ("TRIO", "TRIONL2U"),
    ("ASNB", "ASNBNL21"),
    ("KNAB", "KNABNL2H"),
    ("BUNQ", "BUNQNL2A"),
    ("RBRB", "RBRBNL21"),
];

const COUNTRY: &str = "NL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticBankAccount {
    pub iban: String,
    pub bic: String,
}

#[derive(Debug, Default)]
pub struct FinancialAccountProvider;

impl FinancialAccountProvider {
    pub fn new() -> Self {
        FinancialAccountProvider
    }

    pub fn account<R: Rng>(&self, rng: &mut R) -> Result<SyntheticBankAccount> {
        let (bank_code, bic) = BANKS
            .choose(rng)
            .ok_or_else(|| ScrubError::Config("empty bank table".to_string()))?;

        let bban = format!("{}{}", bank_code, account_number(rng));
        let check = check_digits(COUNTRY, &bban);

        Ok(SyntheticBankAccount {
            iban: format!("{}{:02}{}", COUNTRY, check, bban),
            bic: bic.to_string(),
        })
    }
}

impl SyntheticValueProvider for FinancialAccountProvider {
    type Request = ();
    type Value = SyntheticBankAccount;

    fn generate<R: Rng>(&self, rng: &mut R, _request: &()) -> Result<SyntheticBankAccount> {
        self.account(rng)
    }
}

/// Ten digits passing the Dutch 11-proof (weights 10..1, sum divisible by 11)
fn account_number<R: Rng>(rng: &mut R) -> String {
    loop {
        let digits: Vec<u32> = (0..9).map(|_| rng.gen_range(0..10)).collect();
        let sum: u32 = digits
            .iter()
            .zip((2..=10).rev())
            .map(|(d, w)| d * w)
            .sum();
        let last = (11 - sum % 11) % 11;
        if last < 10 {
            return digits
                .iter()
                .chain(std::iter::once(&last))
                .map(|d| d.to_string())
                .collect();
        }
    }
}

/// Remainder mod 97 of an alphanumeric string with letters as 10..35
fn mod97(text: &str) -> u32 {
    text.chars().fold(0, |acc, c| {
        let value = c.to_digit(36).unwrap_or(0);
        if value >= 10 {
            (acc * 100 + value) % 97
        } else {
            (acc * 10 + value) % 97
        }
    })
}

/// ISO 7064 MOD 97-10 check digits
fn check_digits(country: &str, bban: &str) -> u32 {
    98 - mod97(&format!("{}{}00", bban, country))
}

/// Structural IBAN check: length and MOD 97 remainder of 1
pub fn iban_is_valid(iban: &str) -> bool {
    if iban.len() < 5 || !iban.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let (head, tail) = iban.split_at(4);
    mod97(&format!("{}{}", tail, head)) == 1
}
