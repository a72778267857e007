// 📥 Record streams over the contact store
//
// A phase asks for every record of one entity type that is not on the keep
// list. Rows are handed to a visitor one at a time straight off the cursor, so
// memory does not grow with the table. Rows come back in primary-key order.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{Result, ScrubError};
use crate::postcode::{postal_code_key, NumberParity, PostcodeEntry, PostcodeLookup};

// ============================================================================
// ENTITY KINDS
// ============================================================================

/// The three tables holding bank account numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankAccountTable {
    Generic,
    Membership,
    Contribution,
}

impl BankAccountTable {
    pub fn table(&self) -> &'static str {
        match self {
            BankAccountTable::Generic => "civicrm_value_iban",
            BankAccountTable::Membership => "civicrm_value_iban_membership",
            BankAccountTable::Contribution => "civicrm_value_iban_contribution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Contact,
    Address,
    Phone,
    Email,
    Membership,
    BankAccount(BankAccountTable),
    Mandate,
}

/// How the keep list applies to an entity's table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionScope {
    /// Rows are contacts: filter on id and contact_sub_type
    Contact,
    /// Rows belong to a contact through contact_id
    OwnedByContact,
    /// No link to a contact; every row is replaced
    Unfiltered,
}

impl EntityKind {
    /// Label used for progress counters and the run report
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Contact => "contact",
            EntityKind::Address => "address",
            EntityKind::Phone => "phone",
            EntityKind::Email => "email",
            EntityKind::Membership => "membership",
            EntityKind::BankAccount(BankAccountTable::Generic) => "iban",
            EntityKind::BankAccount(BankAccountTable::Membership) => "iban_membership",
            EntityKind::BankAccount(BankAccountTable::Contribution) => "iban_contribution",
            EntityKind::Mandate => "sepa_mandate",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Contact => "civicrm_contact",
            EntityKind::Address => "civicrm_address",
            EntityKind::Phone => "civicrm_phone",
            EntityKind::Email => "civicrm_email",
            EntityKind::Membership => "civicrm_membership",
            EntityKind::BankAccount(t) => t.table(),
            EntityKind::Mandate => "civicrm_value_sepa_mandaat",
        }
    }

    pub fn exclusion_scope(&self) -> ExclusionScope {
        match self {
            EntityKind::Contact => ExclusionScope::Contact,
            EntityKind::Address | EntityKind::Phone | EntityKind::Email | EntityKind::Membership => {
                ExclusionScope::OwnedByContact
            }
            EntityKind::BankAccount(_) | EntityKind::Mandate => ExclusionScope::Unfiltered,
        }
    }

    /// Columns read from the store, id first
    fn columns(&self) -> &'static str {
        match self {
            EntityKind::Contact => "id, is_deceased",
            EntityKind::Address => "id, postal_code, street_number",
            EntityKind::Phone => "id, phone_type_id",
            EntityKind::Membership => "id, status_id",
            EntityKind::Email | EntityKind::BankAccount(_) | EntityKind::Mandate => "id",
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ContactRecord {
    pub id: i64,
    pub is_deceased: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    pub id: i64,
    pub postal_code: Option<String>,
    pub street_number: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneRecord {
    pub id: i64,
    pub phone_type_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRecord {
    pub id: i64,
    pub status_id: Option<i64>,
}

/// Read-only view of one source row
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Contact(ContactRecord),
    Address(AddressRecord),
    Phone(PhoneRecord),
    Email { id: i64 },
    Membership(MembershipRecord),
    BankAccount { table: BankAccountTable, id: i64 },
    Mandate { id: i64 },
}

impl SourceRecord {
    pub fn id(&self) -> i64 {
        match self {
            SourceRecord::Contact(r) => r.id,
            SourceRecord::Address(r) => r.id,
            SourceRecord::Phone(r) => r.id,
            SourceRecord::Membership(r) => r.id,
            SourceRecord::Email { id }
            | SourceRecord::BankAccount { id, .. }
            | SourceRecord::Mandate { id } => *id,
        }
    }
}

// ============================================================================
// QUERY + SOURCE TRAIT
// ============================================================================

/// Keep list: contacts (and everything they own) that stay untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    pub keep_ids: BTreeSet<i64>,
    pub keep_subtypes: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct RecordQuery<'a> {
    pub kind: EntityKind,
    pub exclusion: &'a ExclusionFilter,
    /// Only addresses in this country are streamed
    pub domestic_country_id: i64,
}

/// Forward-only, single-pass access to the records of one entity type
pub trait RecordSource {
    /// Feed every matching record to `visit`, in primary-key order.
    ///
    /// Stops at the first error, whether it comes from the store or from
    /// `visit`. Returns the number of records visited.
    fn stream(
        &self,
        query: &RecordQuery<'_>,
        visit: &mut dyn FnMut(SourceRecord) -> Result<()>,
    ) -> Result<u64>;
}

// ============================================================================
// SQLITE SOURCE
// ============================================================================

/// Record source over a SQLite copy of the CiviCRM tables
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| ScrubError::source_read("store", e))?;
        Ok(SqliteSource { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteSource { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// SELECT statement and bound parameters for a query
fn select_sql(query: &RecordQuery<'_>) -> (String, Vec<Value>) {
    let kind = query.kind;
    let filter = query.exclusion;
    let mut sql = format!("SELECT {} FROM {} WHERE 1 = 1", kind.columns(), kind.table());
    let mut params: Vec<Value> = Vec::new();

    if kind == EntityKind::Address {
        sql.push_str(" AND country_id = ?");
        params.push(Value::Integer(query.domestic_country_id));
    }

    let id_column = match kind.exclusion_scope() {
        ExclusionScope::Contact => Some("id"),
        ExclusionScope::OwnedByContact => Some("contact_id"),
        ExclusionScope::Unfiltered => None,
    };

    if let Some(column) = id_column {
        // NOT IN is NULL for a NULL owner; ownerless rows are never kept
        let null_guard = match kind.exclusion_scope() {
            ExclusionScope::OwnedByContact => "contact_id IS NULL OR ",
            _ => "",
        };

        if !filter.keep_ids.is_empty() {
            sql.push_str(&format!(
                " AND ({}{} NOT IN ({}))",
                null_guard,
                column,
                placeholders(filter.keep_ids.len())
            ));
            params.extend(filter.keep_ids.iter().map(|id| Value::Integer(*id)));
        }

        if !filter.keep_subtypes.is_empty() {
            let list = placeholders(filter.keep_subtypes.len());
            if kind.exclusion_scope() == ExclusionScope::Contact {
                sql.push_str(&format!(
                    " AND (contact_sub_type IS NULL OR contact_sub_type NOT IN ({}))",
                    list
                ));
            } else {
                // Matches single-valued contact_sub_type only, not the
                // \x01-delimited multi-value form
                sql.push_str(&format!(
                    " AND ({}contact_id NOT IN (SELECT id FROM civicrm_contact WHERE contact_sub_type IN ({})))",
                    null_guard, list
                ));
            }
            params.extend(filter.keep_subtypes.iter().map(|s| Value::Text(s.clone())));
        }
    }

    sql.push_str(" ORDER BY id");
    (sql, params)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn map_row(kind: EntityKind, row: &Row<'_>) -> rusqlite::Result<SourceRecord> {
    let id: i64 = row.get(0)?;

    Ok(match kind {
        EntityKind::Contact => {
            let deceased: Option<i64> = row.get(1)?;
            SourceRecord::Contact(ContactRecord {
                id,
                is_deceased: deceased.unwrap_or(0) != 0,
            })
        }
        EntityKind::Address => SourceRecord::Address(AddressRecord {
            id,
            postal_code: row.get(1)?,
            street_number: row.get(2)?,
        }),
        EntityKind::Phone => SourceRecord::Phone(PhoneRecord {
            id,
            phone_type_id: row.get(1)?,
        }),
        EntityKind::Email => SourceRecord::Email { id },
        EntityKind::Membership => SourceRecord::Membership(MembershipRecord {
            id,
            status_id: row.get(1)?,
        }),
        EntityKind::BankAccount(table) => SourceRecord::BankAccount { table, id },
        EntityKind::Mandate => SourceRecord::Mandate { id },
    })
}

impl RecordSource for SqliteSource {
    fn stream(
        &self,
        query: &RecordQuery<'_>,
        visit: &mut dyn FnMut(SourceRecord) -> Result<()>,
    ) -> Result<u64> {
        let label = query.kind.label();
        let read_err = |e: rusqlite::Error| ScrubError::source_read(label, e);

        let (sql, params) = select_sql(query);
        let mut stmt = self.conn.prepare(&sql).map_err(read_err)?;
        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(read_err)?;

        let mut visited = 0;
        while let Some(row) = rows.next().map_err(read_err)? {
            let record = map_row(query.kind, row).map_err(read_err)?;
            visit(record)?;
            visited += 1;
        }

        Ok(visited)
    }
}

impl PostcodeLookup for SqliteSource {
    /// Reads the `civicrm_postcodenl` reference table
    fn entries_for(&self, postal_code: &str) -> Result<Vec<PostcodeEntry>> {
        let key = postal_code_key(postal_code);
        if key.len() != 6 || !key.is_ascii() {
            return Ok(Vec::new());
        }
        let Ok(number) = key[..4].parse::<i64>() else {
            return Ok(Vec::new());
        };
        let letters = &key[4..];
        let read_err = |e: rusqlite::Error| ScrubError::source_read("postcode", e);

        let mut stmt = self
            .conn
            .prepare(
                "SELECT adres, woonplaats, huisnummer_van, huisnummer_tot, even, latitude, longitude
                 FROM civicrm_postcodenl
                 WHERE postcode_nr = ?1 AND postcode_letter = ?2
                   AND huisnummer_van > 0 AND huisnummer_tot > 0
                 ORDER BY id",
            )
            .map_err(read_err)?;

        let canonical = format!("{} {}", &key[..4], letters);
        let entries = stmt
            .query_map(rusqlite::params![number, letters], |row| {
                let even: Option<i64> = row.get(4)?;
                Ok(PostcodeEntry {
                    postcode: canonical.clone(),
                    street: row.get(0)?,
                    city: row.get(1)?,
                    number_from: row.get(2)?,
                    number_to: row.get(3)?,
                    parity: match even {
                        Some(1) => NumberParity::Even,
                        Some(0) => NumberParity::Odd,
                        _ => NumberParity::Mixed,
                    },
                    latitude: row.get(5)?,
                    longitude: row.get(6)?,
                })
            })
            .map_err(read_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(read_err)?;

        Ok(entries)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use rusqlite::{params, Connection};

    /// Minimal CiviCRM-shaped schema in an in-memory database
    pub fn setup_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE civicrm_contact (
                id INTEGER PRIMARY KEY,
                contact_sub_type TEXT,
                is_deceased INTEGER DEFAULT 0,
                first_name TEXT
            );
            CREATE TABLE civicrm_address (
                id INTEGER PRIMARY KEY,
                contact_id INTEGER,
                country_id INTEGER,
                postal_code TEXT,
                street_number INTEGER
            );
            CREATE TABLE civicrm_phone (
                id INTEGER PRIMARY KEY,
                contact_id INTEGER,
                phone_type_id INTEGER
            );
            CREATE TABLE civicrm_email (
                id INTEGER PRIMARY KEY,
                contact_id INTEGER
            );
            CREATE TABLE civicrm_membership (
                id INTEGER PRIMARY KEY,
                contact_id INTEGER,
                status_id INTEGER
            );
            CREATE TABLE civicrm_value_iban (id INTEGER PRIMARY KEY, entity_id INTEGER);
            CREATE TABLE civicrm_value_iban_membership (id INTEGER PRIMARY KEY, entity_id INTEGER);
            CREATE TABLE civicrm_value_iban_contribution (id INTEGER PRIMARY KEY, entity_id INTEGER);
            CREATE TABLE civicrm_value_sepa_mandaat (id INTEGER PRIMARY KEY, entity_id INTEGER);
            CREATE TABLE civicrm_postcodenl (
                id INTEGER PRIMARY KEY,
                postcode_nr INTEGER,
                postcode_letter TEXT,
                huisnummer_van INTEGER,
                huisnummer_tot INTEGER,
                adres TEXT,
                woonplaats TEXT,
                even INTEGER,
                latitude REAL,
                longitude REAL
            );",
        )
        .unwrap();
        conn
    }

    pub fn insert_contact(conn: &Connection, id: i64, sub_type: Option<&str>, deceased: bool) {
        conn.execute(
            "INSERT INTO civicrm_contact (id, contact_sub_type, is_deceased, first_name) VALUES (?1, ?2, ?3, 'Real')",
            params![id, sub_type, deceased as i64],
        )
        .unwrap();
    }

    pub fn insert_address(
        conn: &Connection,
        id: i64,
        contact_id: i64,
        country_id: i64,
        postal_code: &str,
        street_number: i64,
    ) {
        conn.execute(
            "INSERT INTO civicrm_address (id, contact_id, country_id, postal_code, street_number) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, contact_id, country_id, postal_code, street_number],
        )
        .unwrap();
    }

    pub fn insert_owned(conn: &Connection, table: &str, id: i64, contact_id: i64, extra: Option<i64>) {
        let sql = match table {
            "civicrm_phone" => "INSERT INTO civicrm_phone (id, contact_id, phone_type_id) VALUES (?1, ?2, ?3)",
            "civicrm_membership" => "INSERT INTO civicrm_membership (id, contact_id, status_id) VALUES (?1, ?2, ?3)",
            "civicrm_email" => "INSERT INTO civicrm_email (id, contact_id) VALUES (?1, ?2)",
            other => panic!("no fixture for {}", other),
        };
        if table == "civicrm_email" {
            conn.execute(sql, params![id, contact_id]).unwrap();
        } else {
            conn.execute(sql, params![id, contact_id, extra]).unwrap();
        }
    }

    pub fn insert_plain(conn: &Connection, table: &str, id: i64) {
        conn.execute(&format!("INSERT INTO {} (id) VALUES (?1)", table), params![id])
            .unwrap();
    }

    pub fn insert_postcode(
        conn: &Connection,
        number: i64,
        letters: &str,
        street: &str,
        city: &str,
        from: i64,
        to: i64,
    ) {
        conn.execute(
            "INSERT INTO civicrm_postcodenl (postcode_nr, postcode_letter, huisnummer_van, huisnummer_tot, adres, woonplaats, even, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 52.1, 5.2)",
            params![number, letters, from, to, street, city],
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn collect(source: &SqliteSource, kind: EntityKind, filter: &ExclusionFilter) -> Vec<SourceRecord> {
        let mut records = Vec::new();
        let query = RecordQuery {
            kind,
            exclusion: filter,
            domestic_country_id: 1152,
        };
        let count = source
            .stream(&query, &mut |record| {
                records.push(record);
                Ok(())
            })
            .unwrap();
        assert_eq!(count as usize, records.len());
        records
    }

    #[test]
    fn test_contacts_respect_keep_list() {
        let conn = setup_store();
        insert_contact(&conn, 1, None, false);
        insert_contact(&conn, 2, Some("Staff"), false);
        insert_contact(&conn, 3, Some("Member"), true);
        insert_contact(&conn, 4, None, false);
        let source = SqliteSource::from_connection(conn);

        let filter = ExclusionFilter {
            keep_ids: BTreeSet::from([4]),
            keep_subtypes: BTreeSet::from(["Staff".to_string()]),
        };
        let records = collect(&source, EntityKind::Contact, &filter);

        assert_eq!(
            records,
            vec![
                SourceRecord::Contact(ContactRecord { id: 1, is_deceased: false }),
                SourceRecord::Contact(ContactRecord { id: 3, is_deceased: true }),
            ]
        );
    }

    #[test]
    fn test_empty_keep_list_streams_everything() {
        let conn = setup_store();
        for id in [5, 1, 3] {
            insert_contact(&conn, id, None, false);
        }
        let source = SqliteSource::from_connection(conn);

        let ids: Vec<i64> = collect(&source, EntityKind::Contact, &ExclusionFilter::default())
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_owned_rows_of_kept_contacts_are_skipped() {
        let conn = setup_store();
        insert_contact(&conn, 1, None, false);
        insert_contact(&conn, 2, Some("Staff"), false);
        insert_contact(&conn, 3, None, false);
        insert_owned(&conn, "civicrm_phone", 10, 1, Some(2));
        insert_owned(&conn, "civicrm_phone", 11, 2, Some(1));
        insert_owned(&conn, "civicrm_phone", 12, 3, None);
        let source = SqliteSource::from_connection(conn);

        let filter = ExclusionFilter {
            keep_ids: BTreeSet::from([3]),
            keep_subtypes: BTreeSet::from(["Staff".to_string()]),
        };
        let records = collect(&source, EntityKind::Phone, &filter);

        assert_eq!(
            records,
            vec![SourceRecord::Phone(PhoneRecord { id: 10, phone_type_id: Some(2) })]
        );
    }

    #[test]
    fn test_ownerless_rows_stream_despite_keep_list() {
        let conn = setup_store();
        insert_contact(&conn, 1, Some("Staff"), false);
        insert_owned(&conn, "civicrm_phone", 10, 1, Some(1));
        conn.execute_batch(
            "INSERT INTO civicrm_phone (id, contact_id, phone_type_id) VALUES (50, NULL, 1);
             INSERT INTO civicrm_email (id, contact_id) VALUES (60, NULL);",
        )
        .unwrap();
        let source = SqliteSource::from_connection(conn);

        for filter in [
            ExclusionFilter {
                keep_ids: BTreeSet::from([999]),
                keep_subtypes: BTreeSet::new(),
            },
            ExclusionFilter {
                keep_ids: BTreeSet::new(),
                keep_subtypes: BTreeSet::from(["Staff".to_string()]),
            },
            ExclusionFilter {
                keep_ids: BTreeSet::from([1]),
                keep_subtypes: BTreeSet::from(["Staff".to_string()]),
            },
        ] {
            let phones = collect(&source, EntityKind::Phone, &filter);
            let emails = collect(&source, EntityKind::Email, &filter);
            assert!(phones.contains(&SourceRecord::Phone(PhoneRecord { id: 50, phone_type_id: Some(1) })), "{:?}", filter);
            assert_eq!(emails, vec![SourceRecord::Email { id: 60 }], "{:?}", filter);
        }
    }

    #[test]
    fn test_only_domestic_addresses_streamed() {
        let conn = setup_store();
        insert_contact(&conn, 1, None, false);
        insert_address(&conn, 20, 1, 1152, "1234 AB", 10);
        insert_address(&conn, 21, 1, 1076, "10115", 3);
        let source = SqliteSource::from_connection(conn);

        let records = collect(&source, EntityKind::Address, &ExclusionFilter::default());
        assert_eq!(
            records,
            vec![SourceRecord::Address(AddressRecord {
                id: 20,
                postal_code: Some("1234 AB".to_string()),
                street_number: Some(10),
            })]
        );
    }

    #[test]
    fn test_unfiltered_tables_ignore_keep_list() {
        let conn = setup_store();
        insert_plain(&conn, "civicrm_value_iban_membership", 1);
        insert_plain(&conn, "civicrm_value_iban_membership", 2);
        let source = SqliteSource::from_connection(conn);

        let filter = ExclusionFilter {
            keep_ids: BTreeSet::from([1, 2]),
            keep_subtypes: BTreeSet::new(),
        };
        let kind = EntityKind::BankAccount(BankAccountTable::Membership);
        let records = collect(&source, kind, &filter);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            SourceRecord::BankAccount { table: BankAccountTable::Membership, id: 1 }
        );
    }

    #[test]
    fn test_missing_table_is_source_read_error() {
        let source = SqliteSource::from_connection(Connection::open_in_memory().unwrap());
        let filter = ExclusionFilter::default();
        let query = RecordQuery {
            kind: EntityKind::Email,
            exclusion: &filter,
            domestic_country_id: 1152,
        };

        let err = source.stream(&query, &mut |_| Ok(())).unwrap_err();
        assert!(matches!(err, ScrubError::SourceRead { entity: "email", .. }));
    }

    #[test]
    fn test_visitor_error_stops_stream() {
        let conn = setup_store();
        for id in 1..=5 {
            insert_contact(&conn, id, None, false);
        }
        let source = SqliteSource::from_connection(conn);
        let filter = ExclusionFilter::default();
        let query = RecordQuery {
            kind: EntityKind::Contact,
            exclusion: &filter,
            domestic_country_id: 1152,
        };

        let mut seen = 0;
        let result = source.stream(&query, &mut |record| {
            seen += 1;
            if record.id() == 3 {
                Err(ScrubError::Format("stop".to_string()))
            } else {
                Ok(())
            }
        });

        assert!(matches!(result, Err(ScrubError::Format(_))));
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_postcode_lookup_from_store() {
        let conn = setup_store();
        insert_postcode(&conn, 1234, "AB", "Dorpsstraat", "Ons Dorp", 1, 50);
        insert_postcode(&conn, 1234, "AB", "Leeg", "Ons Dorp", 0, 0);
        insert_postcode(&conn, 1234, "AC", "Kerkplein", "Ons Dorp", 1, 9);
        let source = SqliteSource::from_connection(conn);

        let entries = source.entries_for("1234ab").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].street, "Dorpsstraat");
        assert_eq!(entries[0].postcode, "1234 AB");
        assert_eq!(entries[0].parity, NumberParity::Mixed);

        assert!(source.entries_for("B-1000").unwrap().is_empty());
        assert!(source.entries_for("9999 ZZ").unwrap().is_empty());
    }
}
