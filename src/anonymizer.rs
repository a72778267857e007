// 🔁 Run orchestration
//
// Phases run in a fixed order, each streaming one entity type through the
// statement builder into the script. The first error stops the run: the
// script gets an abort marker instead of the commit trailer.

use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::config::ScrubConfig;
use crate::error::{Result, ScrubError};
use crate::postcode::PostcodeLookup;
use crate::progress::ProgressReporter;
use crate::script::ScriptEmitter;
use crate::source::{BankAccountTable, EntityKind, ExclusionFilter, RecordQuery, RecordSource};
use crate::statement::{delete_foreign_addresses, truncate_table, StatementBuilder};

// ============================================================================
// PHASES + STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Contacts,
    Addresses,
    /// Foreign addresses deleted, address history truncated
    AddressCleanup,
    Phones,
    Emails,
    Memberships,
    BankAccounts(BankAccountTable),
    Mandates,
}

pub const PHASES: [Phase; 10] = [
    Phase::Contacts,
    Phase::Addresses,
    Phase::AddressCleanup,
    Phase::Phones,
    Phase::Emails,
    Phase::Memberships,
    Phase::BankAccounts(BankAccountTable::Generic),
    Phase::BankAccounts(BankAccountTable::Membership),
    Phase::BankAccounts(BankAccountTable::Contribution),
    Phase::Mandates,
];

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Contacts => "contacts",
            Phase::Addresses => "addresses",
            Phase::AddressCleanup => "address_cleanup",
            Phase::Phones => "phones",
            Phase::Emails => "emails",
            Phase::Memberships => "memberships",
            Phase::BankAccounts(BankAccountTable::Generic) => "iban",
            Phase::BankAccounts(BankAccountTable::Membership) => "iban_membership",
            Phase::BankAccounts(BankAccountTable::Contribution) => "iban_contribution",
            Phase::Mandates => "sepa_mandates",
        }
    }

    /// Entity streamed by this phase; `None` for fixed statements
    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            Phase::Contacts => Some(EntityKind::Contact),
            Phase::Addresses => Some(EntityKind::Address),
            Phase::AddressCleanup => None,
            Phase::Phones => Some(EntityKind::Phone),
            Phase::Emails => Some(EntityKind::Email),
            Phase::Memberships => Some(EntityKind::Membership),
            Phase::BankAccounts(table) => Some(EntityKind::BankAccount(*table)),
            Phase::Mandates => Some(EntityKind::Mandate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Emitting(Phase),
    Finalized,
    Aborted,
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCount {
    pub entity: &'static str,
    pub records: u64,
}

/// Terminal status of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output: String,
    pub generated_at: NaiveDateTime,
    pub seed: u64,
    pub counts: Vec<EntityCount>,
    pub statements: u64,
    pub bytes: u64,
    pub sha256: String,
}

impl RunReport {
    pub fn records(&self, entity: &str) -> u64 {
        self.counts
            .iter()
            .find(|c| c.entity == entity)
            .map(|c| c.records)
            .unwrap_or(0)
    }
}

// ============================================================================
// ANONYMIZER
// ============================================================================

pub struct Anonymizer<'a> {
    config: ScrubConfig,
    exclusion: ExclusionFilter,
    source: &'a dyn RecordSource,
    lookup: &'a dyn PostcodeLookup,
    state: RunState,
}

impl<'a> Anonymizer<'a> {
    pub fn new(
        config: ScrubConfig,
        source: &'a dyn RecordSource,
        lookup: &'a dyn PostcodeLookup,
    ) -> Self {
        let exclusion = ExclusionFilter {
            keep_ids: config.keep_contact_ids.clone(),
            keep_subtypes: config.keep_contact_subtypes.clone(),
        };

        Anonymizer {
            config,
            exclusion,
            source,
            lookup,
            state: RunState::Init,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Write the script to `path`, creating or truncating it
    pub fn run(&mut self, path: &Path) -> Result<RunReport> {
        let target = path.display().to_string();
        let file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                self.state = RunState::Aborted;
                error!(output = %target, error = %e, "cannot create output artifact");
                return Err(ScrubError::resource(target, e));
            }
        };

        self.run_to_writer(BufWriter::new(file), &target)
    }

    pub fn run_to_writer<W: Write>(&mut self, writer: W, target: &str) -> Result<RunReport> {
        if self.state != RunState::Init {
            return Err(ScrubError::Config(
                "an anonymizer can only run once".to_string(),
            ));
        }

        let now = self
            .config
            .reference_time
            .unwrap_or_else(|| Local::now().naive_local());
        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(seed, locale = self.config.locale.code(), output = target, "starting anonymization run");

        let builder = match StatementBuilder::new(&self.config, self.lookup, now) {
            Ok(builder) => builder,
            Err(e) => {
                self.state = RunState::Aborted;
                return Err(e);
            }
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let mut progress = ProgressReporter::new(self.config.progress_batch_size);
        for phase in PHASES {
            if let Some(kind) = phase.entity() {
                progress.register(kind.label());
            }
        }

        let mut emitter = ScriptEmitter::new(writer, target);
        if let Err(e) = emitter.begin(now) {
            self.state = RunState::Aborted;
            return Err(e);
        }

        for phase in PHASES {
            self.state = RunState::Emitting(phase);
            debug!(phase = phase.label(), "phase started");

            if let Err(e) = self.run_phase(phase, &builder, &mut rng, &mut emitter, &mut progress) {
                self.state = RunState::Aborted;
                error!(phase = phase.label(), error = %e, "run aborted; script is unsafe to execute");
                if let Err(abort_err) = emitter.abort(&e.to_string()) {
                    warn!(error = %abort_err, "could not write abort marker");
                }
                return Err(ScrubError::Aborted {
                    phase: phase.label(),
                    source: Box::new(e),
                });
            }
        }

        let summary = match emitter.finish() {
            Ok(summary) => summary,
            Err(e) => {
                self.state = RunState::Aborted;
                return Err(e);
            }
        };
        self.state = RunState::Finalized;

        let counts = progress
            .counts()
            .iter()
            .map(|&(entity, records)| EntityCount { entity, records })
            .collect();

        info!(
            output = target,
            statements = summary.statements,
            sha256 = %summary.sha256,
            "anonymization script complete"
        );

        Ok(RunReport {
            output: target.to_string(),
            generated_at: now,
            seed,
            counts,
            statements: summary.statements,
            bytes: summary.bytes,
            sha256: summary.sha256,
        })
    }

    fn run_phase<W: Write>(
        &self,
        phase: Phase,
        builder: &StatementBuilder<'_>,
        rng: &mut StdRng,
        emitter: &mut ScriptEmitter<W>,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        let Some(kind) = phase.entity() else {
            emitter.comment("Foreign addresses and address history")?;
            emitter.statement(&delete_foreign_addresses(self.config.domestic_country_id))?;
            for table in &self.config.truncate_tables {
                emitter.statement(&truncate_table(table)?)?;
            }
            return Ok(());
        };

        emitter.comment(&format!("Phase: {} ({})", phase.label(), kind.table()))?;

        let query = RecordQuery {
            kind,
            exclusion: &self.exclusion,
            domestic_country_id: self.config.domestic_country_id,
        };
        let label = kind.label();

        let visited = self.source.stream(&query, &mut |record| {
            for statement in builder.build(rng, &record)? {
                emitter.statement(&statement)?;
            }
            progress.tick(label);
            Ok(())
        })?;

        info!(phase = phase.label(), records = visited, "phase complete");
        Ok(())
    }
}
