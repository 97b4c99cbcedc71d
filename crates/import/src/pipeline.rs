use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tally_core::{AccountId, StatementId};
use tokio::task::JoinSet;

use crate::error::{ImportError, Result};
use crate::feed::RawStatement;
use crate::rules::{CategoryCache, ClassificationContext};
use crate::settings::ImportSettings;
use crate::store::StatementStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub account: Option<AccountId>,
    /// Newly stored well-formed statements, in feed order.
    pub inserted: Vec<StatementId>,
    /// Stored statements that picked up fields from a duplicate.
    pub repaired: Vec<StatementId>,
    /// Duplicates that added nothing.
    pub discarded: usize,
    /// Records that failed to parse and were stored for manual review.
    pub malformed: Vec<StatementId>,
    /// Records that could not be stored at all.
    pub rejected: usize,
    /// Inserted or repaired statements that were auto-assigned to a category.
    pub classified: usize,
}

/// Drives import batches: dedup and insert under the account's exclusive
/// section, then auto-classification of what was inserted.
pub struct Importer {
    store: Arc<StatementStore>,
    context: RwLock<Arc<ClassificationContext>>,
    cache: Arc<CategoryCache>,
    settings: ImportSettings,
}

impl Importer {
    pub fn new(
        store: Arc<StatementStore>,
        context: ClassificationContext,
        settings: ImportSettings,
    ) -> Self {
        let cache = Arc::new(CategoryCache::new(settings.purpose_prefix_len));
        Self {
            store,
            context: RwLock::new(Arc::new(context)),
            cache,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<StatementStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<CategoryCache> {
        &self.cache
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// The rule set in force right now. Batches take one snapshot and use it
    /// throughout.
    pub fn context(&self) -> Arc<ClassificationContext> {
        let guard = self.context.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Installs a new rule set. Batches already running keep the one they
    /// started with; the category cache is left as is.
    pub fn set_classification_context(&self, context: ClassificationContext) {
        let mut guard = self.context.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(context);
        tracing::info!("classification context replaced ({} rules)", guard.rules().count());
    }

    /// Forgets every cached classification. Call after categories change.
    pub fn init_categories_cache(&self) {
        self.cache.clear();
        tracing::debug!("category cache cleared");
    }

    pub async fn import_batch(
        &self,
        account_id: AccountId,
        records: Vec<RawStatement>,
    ) -> Result<ImportReport> {
        let context = self.context();
        let mut report = ImportReport {
            account: Some(account_id),
            ..Default::default()
        };

        let mut account = self.store.lock_account(account_id).await?;
        for record in records {
            let (candidate, is_malformed) = match record.parse(&self.settings) {
                Ok(statement) => (statement, false),
                Err(e) => {
                    tracing::warn!("account {account_id}: {e}; storing for review");
                    (record.to_review_record(&self.settings), true)
                }
            };

            // Review records are never merged into stored statements.
            let existing = if is_malformed {
                None
            } else {
                self.store
                    .find_match(&account, &candidate, self.settings.date_window_days)
            };
            if let Some(existing) = existing {
                match self.store.repair(&mut account, existing, &candidate) {
                    Ok(0) => {
                        tracing::debug!("statement {existing}: duplicate discarded");
                        report.discarded += 1;
                    }
                    Ok(filled) => {
                        tracing::debug!("statement {existing}: repaired {filled} field(s)");
                        report.repaired.push(existing);
                    }
                    Err(e) => {
                        tracing::warn!("account {account_id}: duplicate not merged: {e}");
                        report.rejected += 1;
                    }
                }
                continue;
            }

            match self.store.insert(&mut account, candidate) {
                Ok(id) if is_malformed => report.malformed.push(id),
                Ok(id) => report.inserted.push(id),
                Err(e) => {
                    tracing::warn!("account {account_id}: record rejected: {e}");
                    report.rejected += 1;
                }
            }
        }
        drop(account);

        let touched: Vec<StatementId> = report
            .inserted
            .iter()
            .chain(&report.repaired)
            .copied()
            .collect();
        report.classified = self.classify_statements(&context, &touched);
        tracing::info!(
            "account {}: {} inserted, {} repaired, {} discarded, {} malformed, {} classified",
            account_id,
            report.inserted.len(),
            report.repaired.len(),
            report.discarded,
            report.malformed.len(),
            report.classified
        );
        Ok(report)
    }

    /// Imports several accounts' batches concurrently, one task per batch.
    /// Reports come back in completion order.
    pub async fn import_all(
        self: &Arc<Self>,
        batches: Vec<(AccountId, Vec<RawStatement>)>,
    ) -> Vec<Result<ImportReport>> {
        let mut workers = JoinSet::new();
        for (account, records) in batches {
            let importer = Arc::clone(self);
            workers.spawn(async move { importer.import_batch(account, records).await });
        }

        let mut reports = Vec::new();
        while let Some(joined) = workers.join_next().await {
            reports.push(joined.unwrap_or_else(|e| Err(ImportError::Worker(e.to_string()))));
        }
        reports
    }

    /// Re-runs classification over every well-formed, not fully assigned
    /// statement of an account. Returns how many were assigned.
    pub async fn classify_pending(&self, account_id: AccountId) -> Result<usize> {
        let ids = {
            let account = self.store.lock_account(account_id).await?;
            account.statement_ids().to_vec()
        };
        let classified = self.classify_statements(&self.context(), &ids);
        tracing::info!("account {account_id}: {classified} pending statement(s) classified");
        Ok(classified)
    }

    fn classify_statements(&self, context: &ClassificationContext, ids: &[StatementId]) -> usize {
        let mut classified = 0;
        for &id in ids {
            let assigned = self.store.update_statement(id, |statement| {
                if !statement.is_well_formed() || statement.is_assigned() {
                    return false;
                }
                match context.classify(statement, &self.cache) {
                    Some(category) => {
                        statement.assign_to_category(category);
                        true
                    }
                    None => false,
                }
            });
            if matches!(assigned, Ok(true)) {
                classified += 1;
            }
        }
        classified
    }
}
