// 📜 Script emitter
//
// Append-only writer for the output artifact. The body is wrapped in a
// transaction that disables constraint checks; the commit trailer is written
// only by `finish`, so an aborted run leaves a script that never commits.

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use std::io::{self, Write};

use crate::dates;
use crate::error::{Result, ScrubError};

pub const STATEMENT_SEPARATOR: &str = ";";

const PREAMBLE: &[&str] = &[
    "SET FOREIGN_KEY_CHECKS = 0",
    "SET UNIQUE_CHECKS = 0",
    "SET AUTOCOMMIT = 0",
];

const TRAILER: &[&str] = &[
    "SET FOREIGN_KEY_CHECKS = 1",
    "SET UNIQUE_CHECKS = 1",
    "SET AUTOCOMMIT = 1",
    "COMMIT",
];

pub const ABORT_MARKER: &str = "-- ABORTED: do not execute this script";

/// Hashes every byte on its way to the inner writer
pub struct DigestWriter<W> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        DigestWriter {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    fn into_parts(self) -> (W, String, u64) {
        let hex = self
            .hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        (self.inner, hex, self.bytes)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// What ended up in the artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSummary {
    /// Statements written, wrapper statements included
    pub statements: u64,
    pub bytes: u64,
    /// Hex SHA-256 of the artifact
    pub sha256: String,
    pub committed: bool,
}

pub struct ScriptEmitter<W: Write> {
    out: DigestWriter<W>,
    target: String,
    statements: u64,
}

impl<W: Write> ScriptEmitter<W> {
    /// `target` names the artifact in error messages
    pub fn new(writer: W, target: impl Into<String>) -> Self {
        ScriptEmitter {
            out: DigestWriter::new(writer),
            target: target.into(),
            statements: 0,
        }
    }

    fn io_err(&self, e: io::Error) -> ScrubError {
        ScrubError::resource(self.target.clone(), e)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).map_err(|e| self.io_err(e))
    }

    /// Header comment plus the preamble that opens the transaction
    pub fn begin(&mut self, generated_at: NaiveDateTime) -> Result<()> {
        self.comment(&format!(
            "Anonymization script generated by contact-scrubber {}",
            crate::VERSION
        ))?;
        self.comment(&format!("Generated at: {}", dates::format_datetime(generated_at)))?;
        self.write_line("")?;
        for statement in PREAMBLE {
            self.statement(statement)?;
        }
        self.write_line("")
    }

    /// Single-line comment; line breaks in `text` are flattened
    pub fn comment(&mut self, text: &str) -> Result<()> {
        let flat = text.replace(['\r', '\n'], " ");
        self.write_line(&format!("-- {}", flat))
    }

    pub fn statement(&mut self, sql: &str) -> Result<()> {
        self.write_line(&format!("{}{}", sql, STATEMENT_SEPARATOR))?;
        self.statements += 1;
        Ok(())
    }

    /// Trailer re-enabling checks and committing, then the footer
    pub fn finish(mut self) -> Result<ScriptSummary> {
        self.write_line("")?;
        for statement in TRAILER {
            self.statement(statement)?;
        }
        self.comment("End of anonymization script")?;
        self.close(true)
    }

    /// Marks the artifact unsafe; no trailer, no commit
    pub fn abort(mut self, reason: &str) -> Result<ScriptSummary> {
        self.write_line("")?;
        self.write_line(ABORT_MARKER)?;
        self.comment(&format!("Reason: {}", reason))?;
        self.close(false)
    }

    fn close(mut self, committed: bool) -> Result<ScriptSummary> {
        self.out.flush().map_err(|e| self.io_err(e))?;
        let statements = self.statements;
        let (_, sha256, bytes) = self.out.into_parts();
        Ok(ScriptSummary {
            statements,
            bytes,
            sha256,
            committed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn render(build: impl FnOnce(&mut ScriptEmitter<&mut Vec<u8>>)) -> (String, ScriptSummary) {
        let mut buf = Vec::new();
        let summary = {
            let mut emitter = ScriptEmitter::new(&mut buf, "memory");
            emitter.begin(generated_at()).unwrap();
            build(&mut emitter);
            emitter.finish().unwrap()
        };
        (String::from_utf8(buf).unwrap(), summary)
    }

    #[test]
    fn test_wrapper_order() {
        let (text, summary) = render(|e| {
            e.statement("UPDATE civicrm_email SET email = 'a@example.org' WHERE id = 1")
                .unwrap();
        });

        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert!(lines[0].starts_with("-- Anonymization script generated by contact-scrubber"));
        assert_eq!(lines[1], "-- Generated at: 2024-06-01 12:00:00");
        assert_eq!(lines[2], "SET FOREIGN_KEY_CHECKS = 0;");
        assert_eq!(lines[3], "SET UNIQUE_CHECKS = 0;");
        assert_eq!(lines[4], "SET AUTOCOMMIT = 0;");
        assert_eq!(lines[5], "UPDATE civicrm_email SET email = 'a@example.org' WHERE id = 1;");
        assert_eq!(lines[6], "SET FOREIGN_KEY_CHECKS = 1;");
        assert_eq!(lines[9], "COMMIT;");
        assert_eq!(lines[10], "-- End of anonymization script");
        assert_eq!(lines.len(), 11);

        assert_eq!(summary.statements, 8);
        assert!(summary.committed);
        assert_eq!(summary.bytes, text.len() as u64);
    }

    #[test]
    fn test_digest_matches_content() {
        let (text, summary) = render(|_| {});
        let expected: String = Sha256::digest(text.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        assert_eq!(summary.sha256, expected);
        assert_eq!(summary.sha256.len(), 64);
    }

    #[test]
    fn test_abort_leaves_no_commit() {
        let mut buf = Vec::new();
        let summary = {
            let mut emitter = ScriptEmitter::new(&mut buf, "memory");
            emitter.begin(generated_at()).unwrap();
            emitter.statement("UPDATE civicrm_contact SET first_name = 'Anna' WHERE id = 1").unwrap();
            emitter.abort("no reference address data\nfor 9999 ZZ").unwrap()
        };
        let text = String::from_utf8(buf).unwrap();

        assert!(!summary.committed);
        assert!(!text.contains("COMMIT"));
        assert!(!text.contains("SET FOREIGN_KEY_CHECKS = 1"));
        assert!(text.contains(ABORT_MARKER));
        assert!(text.contains("-- Reason: no reference address data for 9999 ZZ"));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_resource_error() {
        let mut emitter = ScriptEmitter::new(FailingWriter, "/tmp/out.sql");
        match emitter.begin(generated_at()) {
            Err(ScrubError::Resource { path, .. }) => assert_eq!(path, "/tmp/out.sql"),
            other => panic!("expected resource error, got {:?}", other),
        }
    }
}
