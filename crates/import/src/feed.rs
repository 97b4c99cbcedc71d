use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tally_core::{Statement, StatementError};

use crate::settings::ImportSettings;

/// A statement line as handed over by a feed parser: dates and amounts still
/// in text form, every other field as delivered (missing stays `None`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStatement {
    pub date: Option<String>,
    pub valuta_date: Option<String>,
    pub value: String,
    pub charge: Option<String>,
    pub saldo: Option<String>,
    pub currency: Option<String>,

    pub remote_name: Option<String>,
    pub remote_iban: Option<String>,
    pub remote_bic: Option<String>,
    pub remote_bank_code: Option<String>,
    pub remote_bank_name: Option<String>,
    pub remote_bank_location: Option<String>,
    pub remote_account: Option<String>,
    pub remote_country: Option<String>,
    pub remote_suffix: Option<String>,

    pub local_bank_code: Option<String>,
    pub local_account: Option<String>,
    pub local_suffix: Option<String>,

    pub purpose: Option<String>,
    pub transaction_text: Option<String>,
    pub customer_reference: Option<String>,
    pub bank_reference: Option<String>,
    pub prima_nota: Option<String>,
    pub additional: Option<String>,
    pub transaction_code: Option<i32>,

    #[serde(default)]
    pub is_storno: bool,
    #[serde(default)]
    pub is_manual: bool,

    pub ref1: Option<String>,
    pub ref2: Option<String>,
    pub ref3: Option<String>,
    pub ref4: Option<String>,
}

impl RawStatement {
    /// Strict conversion. Fails with `MalformedRecord` when the amount or a
    /// present date does not parse, or when the record has no date at all.
    pub fn parse(&self, settings: &ImportSettings) -> Result<Statement, StatementError> {
        let value = parse_amount(&self.value)
            .ok_or_else(|| malformed(format!("unparseable amount '{}'", self.value)))?;
        let date = parse_optional_date(&self.date, settings)?;
        let valuta_date = parse_optional_date(&self.valuta_date, settings)?;
        if date.is_none() && valuta_date.is_none() {
            return Err(malformed("record carries no date".to_string()));
        }
        let charge = parse_optional_amount(&self.charge)?;
        let saldo = parse_optional_amount(&self.saldo)?;

        let mut statement = self.build(value, settings);
        statement.date = date;
        statement.valuta_date = valuta_date;
        statement.charge = charge.unwrap_or_default();
        statement.saldo = saldo;
        Ok(statement)
    }

    /// Lenient conversion for records that failed [`RawStatement::parse`].
    /// Unparseable dates stay empty, an unparseable amount becomes zero with
    /// the raw text kept in `additional`, and the result is flagged
    /// `malformed` so it is kept out of auto-classification.
    pub fn to_review_record(&self, settings: &ImportSettings) -> Statement {
        let parsed_value = parse_amount(&self.value);
        let mut statement = self.build(parsed_value.unwrap_or_default(), settings);
        statement.malformed = true;
        statement.date = lenient_date(&self.date, settings);
        statement.valuta_date = lenient_date(&self.valuta_date, settings);
        statement.charge = self
            .charge
            .as_deref()
            .and_then(parse_amount)
            .unwrap_or_default();
        statement.saldo = self.saldo.as_deref().and_then(parse_amount);
        if parsed_value.is_none() {
            let raw = format!("unparsed amount: {}", self.value.trim());
            statement.additional = Some(match statement.additional.take() {
                Some(existing) if !existing.trim().is_empty() => format!("{existing}; {raw}"),
                _ => raw,
            });
        }
        statement
    }

    fn build(&self, value: Decimal, settings: &ImportSettings) -> Statement {
        let currency = self
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(settings.default_currency.as_str());
        let mut s = Statement::new(value, currency);
        s.remote_name = self.remote_name.clone();
        s.remote_iban = self.remote_iban.clone();
        s.remote_bic = self.remote_bic.clone();
        s.remote_bank_code = self.remote_bank_code.clone();
        s.remote_bank_name = self.remote_bank_name.clone();
        s.remote_bank_location = self.remote_bank_location.clone();
        s.remote_account = self.remote_account.clone();
        s.remote_country = self.remote_country.clone();
        s.remote_suffix = self.remote_suffix.clone();
        s.local_bank_code = self.local_bank_code.clone();
        s.local_account = self.local_account.clone();
        s.local_suffix = self.local_suffix.clone();
        s.purpose = self.purpose.clone();
        s.transaction_text = self.transaction_text.clone();
        s.customer_reference = self.customer_reference.clone();
        s.bank_reference = self.bank_reference.clone();
        s.prima_nota = self.prima_nota.clone();
        s.additional = self.additional.clone();
        s.transaction_code = self.transaction_code;
        s.is_storno = self.is_storno;
        s.is_manual = self.is_manual;
        s.ref1 = self.ref1.clone();
        s.ref2 = self.ref2.clone();
        s.ref3 = self.ref3.clone();
        s.ref4 = self.ref4.clone();
        s
    }
}

fn malformed(reason: String) -> StatementError {
    StatementError::MalformedRecord(reason)
}

fn parse_optional_date(
    raw: &Option<String>,
    settings: &ImportSettings,
) -> Result<Option<NaiveDate>, StatementError> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s, settings)
            .map(Some)
            .ok_or_else(|| malformed(format!("unparseable date '{s}'"))),
    }
}

fn lenient_date(raw: &Option<String>, settings: &ImportSettings) -> Option<NaiveDate> {
    parse_optional_date(raw, settings).ok().flatten()
}

fn parse_optional_amount(raw: &Option<String>) -> Result<Option<Decimal>, StatementError> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_amount(s)
            .map(Some)
            .ok_or_else(|| malformed(format!("unparseable amount '{s}'"))),
    }
}

fn parse_date(s: &str, settings: &ImportSettings) -> Option<NaiveDate> {
    settings
        .date_formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Accepts `1234.56`, `1,234.56`, `1.234,56`, `12,50`, `(12.50)` and a
/// leading or trailing currency symbol.
fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
        .collect();
    if s.is_empty() {
        return None;
    }

    let normalized = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        // A lone comma followed by exactly three digits groups thousands.
        (None, Some(comma)) if s.matches(',').count() == 1 && s.len() - comma - 1 != 3 => {
            s.replace(',', ".")
        }
        (None, Some(_)) => s.replace(',', ""),
        _ => s,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}
