use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, StatementError};
use crate::statement::{Statement, StatementId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bank account. Owns the ordered identifier list of its statements; the
/// statements themselves live in a separate store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub currency: String,
    statements: Vec<StatementId>,
}

impl Account {
    pub fn new(id: i64, name: &str, currency: &str) -> Self {
        Account {
            id: AccountId(id),
            name: name.to_string(),
            bank_code: None,
            account_number: None,
            currency: currency.to_string(),
            statements: Vec::new(),
        }
    }

    pub fn statement_ids(&self) -> &[StatementId] {
        &self.statements
    }

    pub fn contains(&self, id: StatementId) -> bool {
        self.statements.contains(&id)
    }

    /// Inserts `id` after every statement that `cmp` does not order after it,
    /// so equal keys keep their arrival order. Already-present ids are ignored.
    pub fn insert_statement_by<F>(&mut self, id: StatementId, mut cmp: F)
    where
        F: FnMut(StatementId) -> Ordering,
    {
        if self.contains(id) {
            return;
        }
        let pos = self
            .statements
            .partition_point(|&other| cmp(other) != Ordering::Greater);
        self.statements.insert(pos, id);
    }

    /// Takes `id` out of the ordered list. Returns whether it was present.
    pub fn remove_statement(&mut self, id: StatementId) -> bool {
        match self.statements.iter().position(|&other| other == id) {
            Some(pos) => {
                self.statements.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl Statement {
    /// Binds this statement to `account`. Rebinding to the same account is a
    /// no-op; a statement is never moved to a different account.
    pub fn add_to_account(&mut self, account: AccountId) -> Result<()> {
        match self.account {
            Some(current) if current == account => Ok(()),
            Some(current) => Err(StatementError::AlreadyBound {
                current,
                requested: account,
            }),
            None => {
                self.account = Some(account);
                Ok(())
            }
        }
    }

    pub fn account(&self) -> Option<AccountId> {
        self.account
    }
}
