//! Save orchestration.
//!
//! [`AuditDbContext`] wraps a [`PersistenceContext`] so that every save also
//! writes the audit trail of the changes it flushes, inside the same
//! transaction. When the wrapped context already has a transaction open,
//! the save runs inside a savepoint and leaves the commit to the outer
//! owner.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::task;
use tracing::{Instrument, Span, debug, error, field, info_span};
use uuid::Uuid;

use auditrail_core::config::AuditOptions;
use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_entity::{AuditEvent, NewAuditLog, Operator};

use crate::assembler::build_audit_log;
use crate::classifier::{ClassifiedChange, classify};
use crate::context::PersistenceContext;
use crate::model::AuditModel;

/// What a save cycle owns and must resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionScope {
    /// The cycle opened the transaction; commit or roll it back.
    Owned,
    /// The cycle runs inside the caller's transaction under this savepoint.
    Savepoint(String),
}

impl TransactionScope {
    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owned => "owned",
            Self::Savepoint(_) => "savepoint",
        }
    }
}

impl fmt::Display for TransactionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned => write!(f, "owned"),
            Self::Savepoint(name) => write!(f, "savepoint {name}"),
        }
    }
}

/// A persistence context whose saves are audited.
pub struct AuditDbContext<C> {
    inner: C,
    model: Arc<AuditModel>,
    options: AuditOptions,
    operator: Option<Operator>,
}

impl<C> fmt::Debug for AuditDbContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditDbContext")
            .field("options", &self.options)
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

impl<C: PersistenceContext> AuditDbContext<C> {
    /// Wrap `inner` with no operator set.
    pub fn new(inner: C, model: Arc<AuditModel>, options: AuditOptions) -> Self {
        Self {
            inner,
            model,
            options,
            operator: None,
        }
    }

    /// Set the acting operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Replace or clear the acting operator.
    pub fn set_operator(&mut self, operator: Option<Operator>) {
        self.operator = operator;
    }

    /// The acting operator, if any.
    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    /// The audit options in effect.
    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// The audit registration.
    pub fn model(&self) -> &Arc<AuditModel> {
        &self.model
    }

    /// The wrapped context.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The wrapped context, for tracking changes or managing transactions.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Unwrap the context.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Save pending changes together with their audit trail.
    ///
    /// Returns the row count of the data save; audit rows are not counted.
    /// Any failure rolls back the owned transaction or the savepoint and is
    /// returned unchanged.
    pub async fn save_changes(
        &mut self,
        accept_all_changes_on_success: bool,
        cancel: &CancellationToken,
    ) -> AppResult<u64> {
        let span = info_span!("audit_save", scope = field::Empty);
        self.save_in_scope(accept_all_changes_on_success, cancel)
            .instrument(span)
            .await
    }

    /// Blocking variant of [`save_changes`](Self::save_changes).
    ///
    /// Outside a runtime a current-thread tokio runtime drives the save.
    /// Inside a multi-threaded runtime the worker is handed over with
    /// `block_in_place`. A current-thread runtime cannot be blocked and
    /// yields an internal error.
    pub fn save_changes_blocking(&mut self, accept_all_changes_on_success: bool) -> AppResult<u64> {
        let cancel = CancellationToken::new();
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(AppError::internal(
                    "Blocking save called from a current-thread runtime; use save_changes",
                )),
                _ => task::block_in_place(|| {
                    handle.block_on(self.save_changes(accept_all_changes_on_success, &cancel))
                }),
            },
            Err(_) => {
                let runtime = Builder::new_current_thread().enable_all().build()?;
                runtime.block_on(self.save_changes(accept_all_changes_on_success, &cancel))
            }
        }
    }

    async fn save_in_scope(
        &mut self,
        accept_all_changes_on_success: bool,
        cancel: &CancellationToken,
    ) -> AppResult<u64> {
        checkpoint(cancel, "opening a transaction")?;
        let scope = self.acquire_scope().await.inspect_err(|err| {
            error!(error = %err, "Failed to open a scope for the audited save");
        })?;
        Span::current().record("scope", scope.as_str());

        match self
            .run_cycle(&scope, accept_all_changes_on_success, cancel)
            .await
        {
            Ok(affected) => Ok(affected),
            Err(err) => {
                error!(error = %err, %scope, "Audited save failed, rolling back");
                self.release_on_failure(&scope).await;
                Err(err)
            }
        }
    }

    async fn acquire_scope(&mut self) -> AppResult<TransactionScope> {
        if self.inner.in_transaction() {
            let name = format!("audit_{}", Uuid::new_v4().simple());
            self.inner.create_savepoint(&name).await?;
            Ok(TransactionScope::Savepoint(name))
        } else {
            self.inner.begin_transaction().await?;
            Ok(TransactionScope::Owned)
        }
    }

    async fn run_cycle(
        &mut self,
        scope: &TransactionScope,
        accept_all_changes_on_success: bool,
        cancel: &CancellationToken,
    ) -> AppResult<u64> {
        let changes = classify(
            &mut self.inner,
            self.operator.as_ref(),
            &self.options,
            &self.model,
            Utc::now(),
        )?;

        let mut logs = self.assemble(&changes, |event| event != AuditEvent::Create)?;

        checkpoint(cancel, "saving changes")?;
        let affected = self.inner.save(accept_all_changes_on_success).await?;

        logs.extend(self.assemble(&changes, |event| event == AuditEvent::Create)?);
        let logged = logs.len();
        self.inner.add_audit_logs(logs);

        checkpoint(cancel, "saving audit logs")?;
        self.inner.save(accept_all_changes_on_success).await?;

        if *scope == TransactionScope::Owned {
            checkpoint(cancel, "commit")?;
            self.inner.commit_transaction().await?;
        }

        debug!(affected, logged, "Logged changes of entities");
        Ok(affected)
    }

    fn assemble(
        &self,
        changes: &[ClassifiedChange],
        include: impl Fn(AuditEvent) -> bool,
    ) -> AppResult<Vec<NewAuditLog>> {
        changes
            .iter()
            .filter(|change| include(change.event))
            .map(|change| {
                let entry = self.inner.entry(change.entry_id).ok_or_else(|| {
                    AppError::internal(format!("Tracked entry {} vanished", change.entry_id))
                })?;
                build_audit_log(entry, change.event, self.operator.as_ref(), &self.model)
            })
            .collect()
    }

    async fn release_on_failure(&mut self, scope: &TransactionScope) {
        let result = match scope {
            TransactionScope::Owned => self.inner.rollback_transaction().await,
            TransactionScope::Savepoint(name) => self.inner.rollback_to_savepoint(name).await,
        };
        if let Err(err) = result {
            error!(error = %err, %scope, "Rollback failed");
        }
    }
}

fn checkpoint(cancel: &CancellationToken, stage: &str) -> AppResult<()> {
    if cancel.is_cancelled() {
        return Err(AppError::cancelled(format!("Save cancelled before {stage}")));
    }
    Ok(())
}
