// 🎭 Synthetic value providers
//
// One provider per replacement category. Each takes the run's shared RNG and
// a category-specific request, and returns a value object that is used for a
// single record and then dropped.

pub mod address;
pub mod bank;
pub mod email;
pub mod names;
pub mod person;
pub mod phone;

use rand::Rng;

use crate::error::Result;

pub use address::{AddressProvider, AddressRequest, SyntheticAddress};
pub use bank::{FinancialAccountProvider, SyntheticBankAccount};
pub use email::EmailProvider;
pub use person::{PersonProvider, SyntheticPerson};
pub use phone::{LineType, PhoneProvider, SyntheticPhone};

/// Common capability of every provider
///
/// Providers hold only configuration and reference data; all randomness comes
/// from the caller's RNG, so a fixed seed fixes every generated value.
pub trait SyntheticValueProvider {
    type Request;
    type Value;

    fn generate<R: Rng>(&self, rng: &mut R, request: &Self::Request) -> Result<Self::Value>;
}

// ============================================================================
// GENDER
// ============================================================================

/// Gender drawn for a synthetic person; codes follow CiviCRM's gender_id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn code(&self) -> i64 {
        match self {
            Gender::Female => 1,
            Gender::Male => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Gender> {
        match code {
            1 => Some(Gender::Female),
            2 => Some(Gender::Male),
            _ => None,
        }
    }
}
