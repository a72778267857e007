// 🚨 Error taxonomy for a scrub run
//
// Every variant is fatal for the run: the orchestrator stops instead of
// skipping records, so a half-anonymized row never reaches the script.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrubError {
    /// The output artifact could not be created or written
    #[error("cannot write output artifact {path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A store cursor failed to open or failed mid-phase
    #[error("reading {entity} records failed: {source}")]
    SourceRead {
        entity: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// No reference address exists for a domestic postal code
    #[error("no reference address data for postal code '{postal_code}' (address id {address_id})")]
    NoAddressData { address_id: i64, postal_code: String },

    /// A value cannot be rendered into a statement
    #[error("format error: {0}")]
    Format(String),

    /// Configuration or reference data is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// A phase stopped the run; the script on disk has no commit trailer
    #[error("run aborted in {phase} phase: {source}")]
    Aborted {
        phase: &'static str,
        #[source]
        source: Box<ScrubError>,
    },
}

impl ScrubError {
    pub fn source_read(entity: &'static str, source: rusqlite::Error) -> Self {
        ScrubError::SourceRead { entity, source }
    }

    pub fn resource(path: impl Into<String>, source: std::io::Error) -> Self {
        ScrubError::Resource {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrubError>;
