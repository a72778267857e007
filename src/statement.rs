// 🧱 Statement builder
//
// Turns one source record into the statement(s) that overwrite it. Text values
// always pass through the escaper; ids, numbers and dates are rendered from
// typed values. No I/O happens here.

use chrono::{NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

use crate::config::{check_identifier, CustomField, ScrubConfig};
use crate::dates;
use crate::error::{Result, ScrubError};
use crate::escape::quote;
use crate::postcode::PostcodeLookup;
use crate::providers::{
    AddressProvider, AddressRequest, EmailProvider, FinancialAccountProvider, PersonProvider,
    PhoneProvider, SyntheticValueProvider,
};
use crate::source::{
    AddressRecord, BankAccountTable, ContactRecord, EntityKind, MembershipRecord, PhoneRecord,
    SourceRecord,
};

// ============================================================================
// UPDATE STATEMENT
// ============================================================================

/// `UPDATE <table> SET ... WHERE id = <id>` with columns in insertion order
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    table: &'static str,
    assignments: Vec<(&'static str, String)>,
}

impl UpdateStatement {
    pub fn new(table: &'static str) -> Self {
        UpdateStatement {
            table,
            assignments: Vec::new(),
        }
    }

    pub fn text(mut self, column: &'static str, value: &str) -> Self {
        self.assignments.push((column, quote(value)));
        self
    }

    pub fn integer(mut self, column: &'static str, value: i64) -> Self {
        self.assignments.push((column, value.to_string()));
        self
    }

    /// Coordinates are stored as text columns
    pub fn coordinate(mut self, column: &'static str, value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ScrubError::Format(format!(
                "{}.{} cannot hold {}",
                self.table, column, value
            )));
        }
        self.assignments.push((column, quote(&value.to_string())));
        Ok(self)
    }

    pub fn date(mut self, column: &'static str, value: NaiveDate) -> Self {
        self.assignments
            .push((column, format!("'{}'", dates::format_date(value))));
        self
    }

    pub fn datetime(mut self, column: &'static str, value: NaiveDateTime) -> Self {
        self.assignments
            .push((column, format!("'{}'", dates::format_datetime(value))));
        self
    }

    pub fn null(mut self, column: &'static str) -> Self {
        self.assignments.push((column, "NULL".to_string()));
        self
    }

    pub fn where_id(self, id: i64) -> String {
        let set = self
            .assignments
            .iter()
            .map(|(column, value)| format!("{} = {}", column, value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("UPDATE {} SET {} WHERE id = {}", self.table, set, id)
    }
}

// ============================================================================
// STATEMENT BUILDER
// ============================================================================

pub struct StatementBuilder<'a> {
    person: PersonProvider,
    address: AddressProvider<'a>,
    phone: PhoneProvider,
    email: EmailProvider,
    bank: FinancialAccountProvider,
    initials_field: Option<CustomField>,
    current_statuses: BTreeSet<i64>,
    mandate_cities: Vec<String>,
    now: NaiveDateTime,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(
        config: &ScrubConfig,
        lookup: &'a dyn PostcodeLookup,
        now: NaiveDateTime,
    ) -> Result<Self> {
        if let Some(field) = &config.initials_field {
            check_identifier(&field.table)?;
            check_identifier(&field.column)?;
        }
        if config.mandate_cities.is_empty() {
            return Err(ScrubError::Config("no mandate cities configured".to_string()));
        }

        Ok(StatementBuilder {
            person: PersonProvider::new(config.locale, config.sort_name_style()),
            address: AddressProvider::new(lookup),
            phone: PhoneProvider::new(config.mobile_phone_type_ids.clone()),
            email: EmailProvider::new(config.locale),
            bank: FinancialAccountProvider::new(),
            initials_field: config.initials_field.clone(),
            current_statuses: config.current_membership_statuses.clone(),
            mandate_cities: config.mandate_cities.clone(),
            now,
        })
    }

    fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Statements replacing the PII of one record
    pub fn build<R: Rng>(&self, rng: &mut R, record: &SourceRecord) -> Result<Vec<String>> {
        match record {
            SourceRecord::Contact(contact) => self.contact(rng, contact),
            SourceRecord::Address(address) => Ok(vec![self.address(rng, address)?]),
            SourceRecord::Phone(phone) => Ok(vec![self.phone(rng, phone)?]),
            SourceRecord::Email { id } => Ok(vec![self.email(rng, *id)?]),
            SourceRecord::Membership(membership) => Ok(vec![self.membership(rng, membership)]),
            SourceRecord::BankAccount { table, id } => {
                Ok(vec![self.bank_account(rng, *table, *id)?])
            }
            SourceRecord::Mandate { id } => Ok(vec![self.mandate(rng, *id)?]),
        }
    }

    fn contact<R: Rng>(&self, rng: &mut R, contact: &ContactRecord) -> Result<Vec<String>> {
        let person = self.person.generate(rng, &())?;
        let today = self.today();

        let birth_date = dates::date_between(
            rng,
            dates::years_before(today, 80),
            dates::years_before(today, 14),
        );

        let mut update = UpdateStatement::new(EntityKind::Contact.table())
            .text("first_name", &person.first_name)
            .text("middle_name", "")
            .text("last_name", &person.last_name)
            .text("display_name", &person.display_name)
            .text("sort_name", &person.sort_name)
            .integer("gender_id", person.gender.code())
            .date("birth_date", birth_date);

        update = if contact.is_deceased {
            let deceased = dates::date_between(rng, dates::years_before(today, 10), today);
            update.date("deceased_date", deceased)
        } else {
            update.null("deceased_date")
        };

        let update = update
            .text("email_greeting_display", &person.greeting)
            .text("postal_greeting_display", &person.greeting)
            .text("addressee_display", &person.addressee);

        let mut statements = vec![update.where_id(contact.id)];

        if let Some(field) = &self.initials_field {
            if !person.initials.is_empty() {
                let initials = quote(&person.initials);
                statements.push(format!(
                    "INSERT INTO {table} (entity_id, {column}) VALUES ({id}, {value}) \
                     ON DUPLICATE KEY UPDATE {column} = {value}",
                    table = field.table,
                    column = field.column,
                    id = contact.id,
                    value = initials,
                ));
            }
        }

        Ok(statements)
    }

    fn address<R: Rng>(&self, rng: &mut R, record: &AddressRecord) -> Result<String> {
        let request = AddressRequest {
            address_id: record.id,
            postal_code: record.postal_code.clone(),
            street_number: record.street_number,
        };
        let address = self.address.generate(rng, &request)?;

        Ok(UpdateStatement::new(EntityKind::Address.table())
            .text("street_address", &address.street_address)
            .text("street_name", &address.street_name)
            .integer("street_number", address.street_number)
            .text("street_unit", &address.street_unit)
            .text("city", &address.city)
            .text("postal_code", &address.postal_code)
            .coordinate("geo_code_1", address.latitude)?
            .coordinate("geo_code_2", address.longitude)?
            .integer("manual_geo_code", 1)
            .where_id(record.id))
    }

    fn phone<R: Rng>(&self, rng: &mut R, record: &PhoneRecord) -> Result<String> {
        let line_type = self.phone.line_type(record.phone_type_id);
        let phone = self.phone.generate(rng, &line_type)?;

        Ok(UpdateStatement::new(EntityKind::Phone.table())
            .text("phone", &phone.phone)
            .text("phone_numeric", &phone.phone_numeric)
            .where_id(record.id))
    }

    fn email<R: Rng>(&self, rng: &mut R, id: i64) -> Result<String> {
        let email = self.email.generate(rng, &())?;

        Ok(UpdateStatement::new(EntityKind::Email.table())
            .text("email", &email)
            .where_id(id))
    }

    /// Current memberships run this calendar year; historical ones ended
    /// somewhere in the last ten years and were joined before that end date.
    fn membership<R: Rng>(&self, rng: &mut R, record: &MembershipRecord) -> String {
        let today = self.today();
        let is_current = record
            .status_id
            .map(|s| self.current_statuses.contains(&s))
            .unwrap_or(false);

        let (start, end, join) = if is_current {
            let join = dates::date_between(rng, dates::years_before(today, 15), today);
            (dates::start_of_year(today), dates::end_of_year(today), join)
        } else {
            let end = dates::date_between(rng, dates::years_before(today, 10), today);
            let join = dates::date_between(rng, dates::years_before(today, 15), end);
            (dates::start_of_year(end), end, join)
        };

        UpdateStatement::new(EntityKind::Membership.table())
            .date("start_date", start)
            .date("end_date", end)
            .date("join_date", join)
            .null("source")
            .where_id(record.id)
    }

    fn bank_account<R: Rng>(&self, rng: &mut R, table: BankAccountTable, id: i64) -> Result<String> {
        let account = self.bank.generate(rng, &())?;

        Ok(UpdateStatement::new(table.table())
            .text("iban", &account.iban)
            .text("bic", &account.bic)
            .where_id(id))
    }

    fn mandate<R: Rng>(&self, rng: &mut R, id: i64) -> Result<String> {
        let signed = dates::datetime_between(
            rng,
            dates::years_before(self.today(), 10).and_time(self.now.time()),
            self.now,
        );
        let city = self
            .mandate_cities
            .choose(rng)
            .ok_or_else(|| ScrubError::Config("no mandate cities configured".to_string()))?;
        let account = self.bank.generate(rng, &())?;

        Ok(UpdateStatement::new(EntityKind::Mandate.table())
            .datetime("mandaat_datum", signed)
            .null("verval_datum")
            .text("plaats", city)
            .text("iban", &account.iban)
            .text("bic", &account.bic)
            .text("tnv", "")
            .where_id(id))
    }
}

// ============================================================================
// FIXED STATEMENTS
// ============================================================================

/// Removes every address outside the domestic country, including those with
/// no country at all
pub fn delete_foreign_addresses(domestic_country_id: i64) -> String {
    format!(
        "DELETE FROM {} WHERE country_id IS NULL OR country_id != {}",
        EntityKind::Address.table(),
        domestic_country_id
    )
}

pub fn truncate_table(table: &str) -> Result<String> {
    check_identifier(table)?;
    Ok(format!("TRUNCATE TABLE {}", table))
}
