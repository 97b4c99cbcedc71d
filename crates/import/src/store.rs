use chrono::{Duration, NaiveDate};
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tally_core::{Account, AccountId, Statement, StatementId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{ImportError, Result};
use crate::match_engine::{matches, repair};

/// In-memory arena of accounts and statements, keyed by identifier.
///
/// Each account sits behind its own async mutex. Holding that guard is the
/// exclusive section for duplicate checks and inserts into the account;
/// statements themselves can be read and edited through the store without it.
#[derive(Debug)]
pub struct StatementStore {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    statements: DashMap<StatementId, Statement>,
    next_id: AtomicI64,
}

impl Default for StatementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            statements: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Registers `account`. An account with the same id is left untouched.
    pub fn add_account(&self, account: Account) {
        self.accounts
            .entry(account.id)
            .or_insert_with(|| Arc::new(Mutex::new(account)));
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        self.accounts.iter().map(|entry| *entry.key()).collect()
    }

    /// Enters the exclusive section of one account.
    pub async fn lock_account(&self, id: AccountId) -> Result<OwnedMutexGuard<Account>> {
        let slot = self
            .accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ImportError::UnknownAccount(id))?;
        Ok(slot.lock_owned().await)
    }

    /// Binds `statement` to `account`, gives it an id (keeping one it already
    /// has) and files it in valuta order.
    pub fn insert(&self, account: &mut Account, mut statement: Statement) -> Result<StatementId> {
        statement.add_to_account(account.id)?;
        let id = match statement.id() {
            Some(id) => {
                self.next_id.fetch_max(id.0 + 1, AtomicOrdering::Relaxed);
                id
            }
            None => StatementId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed)),
        };
        statement.set_id(id);
        self.file(account, id, &statement);
        self.statements.insert(id, statement);
        Ok(id)
    }

    /// First statement of `account` that denotes the same transaction as
    /// `incoming`. Only statements whose valuta day lies within
    /// `window_days` of the incoming one are compared, plus undated ones.
    pub fn find_match(
        &self,
        account: &Account,
        incoming: &Statement,
        window_days: i64,
    ) -> Option<StatementId> {
        let ids = account.statement_ids();
        let (dated, undated) = ids.split_at(ids.partition_point(|id| self.day_of(*id).is_some()));
        let candidates = match incoming.valuta_date.or(incoming.date) {
            Some(day) => {
                let span = Duration::try_days(window_days).unwrap_or(Duration::MAX);
                let lo = day.checked_sub_signed(span).unwrap_or(NaiveDate::MIN);
                let hi = day.checked_add_signed(span).unwrap_or(NaiveDate::MAX);
                let start = dated.partition_point(|id| self.day_of(*id).is_some_and(|d| d < lo));
                let end = dated.partition_point(|id| self.day_of(*id).is_some_and(|d| d <= hi));
                &dated[start..end]
            }
            None => dated,
        };
        candidates.iter().chain(undated).copied().find(|id| {
            self.statements
                .get(id)
                .is_some_and(|stored| matches(&stored, incoming))
        })
    }

    /// Fills empty fields of a stored statement of `account` from `incoming`
    /// and re-files it when that changed its dates. A review record completed
    /// by a cleanly parsed duplicate loses its `malformed` flag, which counts
    /// as one more filled field. Returns the number of fields filled.
    pub fn repair(
        &self,
        account: &mut Account,
        id: StatementId,
        incoming: &Statement,
    ) -> Result<usize> {
        let (filled, refiled) = {
            let mut stored = self
                .statements
                .get_mut(&id)
                .ok_or(ImportError::UnknownStatement(id))?;
            let dates = (stored.valuta_date, stored.date);
            let mut filled = repair(&mut stored, incoming);
            if stored.malformed
                && !incoming.malformed
                && (stored.valuta_date.is_some() || stored.date.is_some())
            {
                stored.malformed = false;
                filled += 1;
            }
            let refiled = (dates != (stored.valuta_date, stored.date)).then(|| Statement::clone(&stored));
            (filled, refiled)
        };
        if let Some(statement) = refiled {
            account.remove_statement(id);
            self.file(account, id, &statement);
        }
        Ok(filled)
    }

    pub fn statement(&self, id: StatementId) -> Option<Statement> {
        self.statements.get(&id).map(|entry| entry.value().clone())
    }

    /// Runs `edit` on a stored statement, e.g. a ledger operation.
    pub fn update_statement<R, F>(&self, id: StatementId, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Statement) -> R,
    {
        let mut stored = self
            .statements
            .get_mut(&id)
            .ok_or(ImportError::UnknownStatement(id))?;
        Ok(edit(&mut stored))
    }

    /// Snapshot of an account's statements in valuta order.
    pub async fn statements_of(&self, account: AccountId) -> Result<Vec<Statement>> {
        let guard = self.lock_account(account).await?;
        Ok(guard
            .statement_ids()
            .iter()
            .filter_map(|id| self.statement(*id))
            .collect())
    }

    fn file(&self, account: &mut Account, id: StatementId, statement: &Statement) {
        account.insert_statement_by(id, |other| {
            self.statements
                .get(&other)
                .map(|stored| stored.compare_valuta(statement))
                .unwrap_or(Ordering::Less)
        });
    }

    /// Sort key of the account list: valuta day, else booking day.
    fn day_of(&self, id: StatementId) -> Option<NaiveDate> {
        self.statements
            .get(&id)
            .and_then(|stored| stored.valuta_date.or(stored.date))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
