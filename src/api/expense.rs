//! Expense API - logging spending requests and moving them through review.
//!
//! An expense only counts against its budget once approved. Approval and the
//! budget's `spent_amount` increase are written in one database transaction,
//! and the increase is an atomic `spent_amount = spent_amount + amount` so
//! concurrent approvals cannot lose each other's updates.

use crate::{
    core::{source::DataSource, store::Record},
    entities::{
        Budget, Expense,
        budget,
        expense::{self, ApprovalStatus, ExpenseFilter, ExpensePatch, NewExpense},
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// Database-backed expense source.
#[derive(Debug, Clone)]
pub struct ExpenseApi {
    db: DatabaseConnection,
}

/// Adds `delta` to a budget's spent amount in a single UPDATE and returns the
/// updated budget.
async fn adjust_spent<C>(db: &C, budget_id: i64, delta: f64) -> Result<budget::Model>
where
    C: ConnectionTrait,
{
    Budget::update_many()
        .col_expr(
            budget::Column::SpentAmount,
            Expr::col(budget::Column::SpentAmount).add(delta),
        )
        .filter(budget::Column::Id.eq(budget_id))
        .exec(db)
        .await?;

    Budget::find_by_id(budget_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("budget", budget_id))
}

impl ExpenseApi {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Logs a pending expense against an existing budget.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAmount`] for a non-positive amount and
    /// [`Error::NotFound`] when the budget does not exist.
    #[instrument(skip(self), fields(budget_id = draft.budget_id, amount = draft.amount))]
    pub async fn log_expense(&self, draft: NewExpense) -> Result<expense::Model> {
        expense::Model::validate_draft(&draft)?;
        Budget::find_by_id(draft.budget_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("budget", draft.budget_id))?;

        let model = expense::ActiveModel {
            budget_id: Set(draft.budget_id),
            amount: Set(draft.amount),
            description: Set(draft.description.trim().to_string()),
            status: Set(ApprovalStatus::Pending),
            logged_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        let created = model.insert(&self.db).await?;
        info!(id = created.id, "expense logged");
        Ok(created)
    }

    /// Expenses charged to one budget, newest first.
    pub async fn for_budget(&self, budget_id: i64) -> Result<Vec<expense::Model>> {
        Expense::find()
            .filter(expense::Column::BudgetId.eq(budget_id))
            .order_by_desc(expense::Column::LoggedAt)
            .order_by_desc(expense::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Moves an expense to `decision` and returns it with its (possibly updated)
    /// budget.
    ///
    /// Approving adds the expense amount to the budget's spent amount.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] when the current status does not allow
    /// the decision, and [`Error::NotFound`] for a missing expense or budget.
    #[instrument(skip(self))]
    pub async fn review(
        &self,
        expense_id: i64,
        decision: ApprovalStatus,
    ) -> Result<(expense::Model, budget::Model)> {
        let txn = self.db.begin().await?;

        let current = Expense::find_by_id(expense_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("expense", expense_id))?;
        let next = current.status.transition_to(decision)?;

        let budget_id = current.budget_id;
        let amount = current.amount;
        let mut active: expense::ActiveModel = current.into();
        active.status = Set(next);
        let reviewed = active.update(&txn).await?;

        let budget = if next == ApprovalStatus::Approved {
            adjust_spent(&txn, budget_id, amount).await?
        } else {
            Budget::find_by_id(budget_id)
                .one(&txn)
                .await?
                .ok_or_else(|| Error::not_found("budget", budget_id))?
        };

        txn.commit().await?;
        info!(status = next.as_str(), spent = budget.spent_amount, "expense reviewed");
        Ok((reviewed, budget))
    }
}

#[async_trait]
impl DataSource<expense::Model> for ExpenseApi {
    async fn get_all(&self, filter: &ExpenseFilter) -> Result<Vec<expense::Model>> {
        let mut query = Expense::find();
        if let Some(budget_id) = filter.budget_id {
            query = query.filter(expense::Column::BudgetId.eq(budget_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(expense::Column::Status.eq(status));
        }
        query
            .order_by_asc(expense::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<expense::Model>> {
        Expense::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn create(&self, draft: NewExpense) -> Result<expense::Model> {
        self.log_expense(draft).await
    }

    /// Edits a pending expense. Reviewed expenses are frozen.
    #[instrument(skip(self, patch))]
    async fn update(&self, id: &i64, patch: ExpensePatch) -> Result<Option<expense::Model>> {
        expense::Model::validate_patch(&patch)?;
        let Some(current) = Expense::find_by_id(*id).one(&self.db).await? else {
            return Ok(None);
        };
        if current.status != ApprovalStatus::Pending {
            return Err(Error::validation(format!(
                "Expense {id} is {} and can no longer be edited",
                current.status.as_str()
            )));
        }
        super::update_by_id::<Expense, _>(&self.db, *id, &patch).await
    }

    /// Deletes an expense; an approved one is first taken back out of its
    /// budget's spent amount.
    #[instrument(skip(self))]
    async fn delete(&self, id: &i64) -> Result<()> {
        let txn = self.db.begin().await?;
        let Some(current) = Expense::find_by_id(*id).one(&txn).await? else {
            return Ok(());
        };
        if current.status == ApprovalStatus::Approved {
            adjust_spent(&txn, current.budget_id, -current.amount).await?;
        }
        current.delete(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}
