//! Command-line shell around the anonymization engine
//!
//! ```bash
//! # Script from a SQLite copy of the store, postcodes from its civicrm_postcodenl table
//! contact-scrubber --store civicrm.db --config scrub.json --output anonymize.sql
//!
//! # Postcode reference data from a CSV export, fixed seed
//! contact-scrubber --store civicrm.db --postcodes postcodes.csv --seed 42 --output anonymize.sql
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use contact_scrubber::config::default_output_path;
use contact_scrubber::{Anonymizer, Locale, PostcodeLookup, PostcodeTable, ScrubConfig, SqliteSource};

#[derive(Parser)]
#[command(name = "contact-scrubber")]
#[command(about = "Generate a transactional SQL script that replaces contact PII with synthetic data")]
#[command(version)]
struct Cli {
    /// SQLite copy of the CiviCRM tables
    #[arg(long, env = "SCRUB_STORE")]
    store: PathBuf,

    /// JSON run configuration
    #[arg(long, env = "SCRUB_CONFIG")]
    config: Option<PathBuf>,

    /// Postcode reference CSV; defaults to the store's civicrm_postcodenl table
    #[arg(long)]
    postcodes: Option<PathBuf>,

    /// Script to write; defaults to a timestamped file in the temp dir
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Seed override for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Name locale override (nl_NL, en_US)
    #[arg(long)]
    locale: Option<Locale>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {e:#}");
        eprintln!("   The script at the output path (if any) must not be executed.");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ScrubConfig::from_file(path)?,
        None => ScrubConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    config.validate()?;

    let source = SqliteSource::open(&cli.store)
        .with_context(|| format!("Failed to open store {:?}", cli.store))?;

    let table;
    let lookup: &dyn PostcodeLookup = match &cli.postcodes {
        Some(path) => {
            table = PostcodeTable::from_csv(path)?;
            tracing::info!(postcodes = table.postcode_count(), "loaded postcode reference data");
            &table
        }
        None => &source,
    };

    let mut anonymizer = Anonymizer::new(config, &source, lookup);
    let output = cli.output.clone().unwrap_or_else(default_output_path);
    let report = anonymizer.run(&output)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("✅ Anonymization script written: {}", report.output);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for count in &report.counts {
        println!("   {:<20} {:>10}", count.entity, count.records);
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   statements: {}", report.statements);
    println!("   seed:       {}", report.seed);
    println!("   sha256:     {}", report.sha256);

    Ok(())
}
