use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

use crate::account::AccountId;
use crate::assignment::Assignment;
use crate::category::CategoryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatementId(pub i64);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One transaction line of a bank statement.
///
/// Feed data lives in public fields. The value, the assignment list and the
/// derived assignment state are private so that `is_assigned` and
/// `nass_value` can only change through the ledger operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    id: Option<StatementId>,
    pub(crate) account: Option<AccountId>,

    pub valuta_date: Option<NaiveDate>,
    pub date: Option<NaiveDate>,

    pub(crate) value: Decimal,
    pub(crate) nass_value: Decimal,
    pub charge: Decimal,
    pub saldo: Option<Decimal>,
    pub currency: String,

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

    pub is_manual: bool,
    pub is_storno: bool,
    pub is_new: bool,
    pub(crate) is_assigned: bool,
    /// Set for feed records whose date or amount could not be parsed.
    pub malformed: bool,

    pub ref1: Option<String>,
    pub ref2: Option<String>,
    pub ref3: Option<String>,
    pub ref4: Option<String>,

    pub(crate) assignments: Vec<Assignment>,
}

impl Statement {
    pub fn new(value: Decimal, currency: &str) -> Self {
        Statement {
            value,
            nass_value: value,
            currency: currency.to_string(),
            is_new: true,
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<StatementId> {
        self.id
    }

    /// Gives the statement its store identifier and points every assignment
    /// back at it.
    pub fn set_id(&mut self, id: StatementId) {
        self.id = Some(id);
        for assignment in &mut self.assignments {
            assignment.statement = Some(id);
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Unassigned remainder as of the last ledger recomputation.
    pub fn nass_value(&self) -> Decimal {
        self.nass_value
    }

    pub fn is_assigned(&self) -> bool {
        self.is_assigned
    }

    /// Dedup fingerprint over booking date, value, remote account and purpose.
    pub fn hash_number(&self) -> i64 {
        let date = self.date.map(|d| d.to_string()).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(date.as_bytes());
        hasher.update(b"|");
        hasher.update(self.value.normalize().to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(field(&self.remote_account).as_bytes());
        hasher.update(b"|");
        hasher.update(field(&self.purpose).as_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(head)
    }

    /// A record can be sorted by date and auto-classified only when it parsed
    /// cleanly and carries at least one date.
    pub fn is_well_formed(&self) -> bool {
        !self.malformed && (self.valuta_date.is_some() || self.date.is_some())
    }

    /// Chronological order by valuta date, then booking date. A missing
    /// valuta date falls back to the booking date; records with no date at
    /// all sort after every dated one.
    pub fn compare_valuta(&self, other: &Statement) -> Ordering {
        let primary = |s: &Statement| s.valuta_date.or(s.date);
        cmp_missing_last(primary(self), primary(other))
            .then_with(|| cmp_missing_last(self.date, other.date))
    }

    /// Purpose on one line followed by the remote name, skipping empty parts.
    pub fn floating_purpose(&self) -> String {
        let purpose = field(&self.purpose)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        join_present([purpose.as_str(), field(&self.remote_name)], ", ")
    }

    pub fn note(&self) -> String {
        join_present(
            [
                field(&self.transaction_text),
                field(&self.customer_reference),
                field(&self.bank_reference),
                field(&self.additional),
            ],
            "; ",
        )
    }

    /// Names of the categories this statement is assigned to, in assignment
    /// order. Categories the lookup does not know are skipped.
    pub fn categories_description<'a, F>(&self, name_of: F) -> String
    where
        F: Fn(CategoryId) -> Option<&'a str>,
    {
        self.assignments
            .iter()
            .filter_map(|a| name_of(a.category))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

fn join_present<'a, I>(parts: I, sep: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn cmp_missing_last(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
