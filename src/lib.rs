// Contact Scrubber - Core Library
// Anonymization engine for CiviCRM contact stores; the CLI and tests build on it

pub mod anonymizer;
pub mod config;
pub mod dates;
pub mod error;
pub mod escape;
pub mod postcode;
pub mod progress;
pub mod providers;
pub mod script;
pub mod source;
pub mod statement;

// Re-export commonly used types
pub use anonymizer::{Anonymizer, EntityCount, Phase, RunReport, RunState, PHASES};
pub use config::{CustomField, Locale, ScrubConfig, SortNameStyle};
pub use error::{Result, ScrubError};
pub use escape::{escape, quote};
pub use postcode::{PostcodeEntry, PostcodeLookup, PostcodeTable};
pub use progress::ProgressReporter;
pub use providers::{
    AddressProvider, EmailProvider, FinancialAccountProvider, Gender, PersonProvider,
    PhoneProvider, SyntheticValueProvider,
};
pub use script::{ScriptEmitter, ScriptSummary};
pub use source::{EntityKind, ExclusionFilter, RecordQuery, RecordSource, SourceRecord, SqliteSource};
pub use statement::{StatementBuilder, UpdateStatement};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
