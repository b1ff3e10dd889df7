//! Budget API - departmental allocations stored in the `budgets` table.

use crate::{
    core::{source::DataSource, store::Record},
    entities::{
        Budget, Expense,
        budget::{self, BudgetFilter, BudgetPatch, BudgetStatus, NewBudget},
        expense,
    },
    errors::Result,
};
use async_trait::async_trait;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Database-backed budget source.
#[derive(Debug, Clone)]
pub struct BudgetApi {
    db: DatabaseConnection,
}

impl BudgetApi {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a budget by its name within one fiscal year.
    ///
    /// Names are unique per fiscal year, which is what seeding relies on.
    pub async fn find_by_name_and_year(
        &self,
        name: &str,
        fiscal_year: i32,
    ) -> Result<Option<budget::Model>> {
        Budget::find()
            .filter(budget::Column::Name.eq(name.trim()))
            .filter(budget::Column::FiscalYear.eq(fiscal_year))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl DataSource<budget::Model> for BudgetApi {
    async fn get_all(&self, filter: &BudgetFilter) -> Result<Vec<budget::Model>> {
        let mut query = Budget::find();
        if let Some(status) = filter.status {
            query = query.filter(budget::Column::Status.eq(status));
        }
        if let Some(year) = filter.fiscal_year {
            query = query.filter(budget::Column::FiscalYear.eq(year));
        }
        if let Some(department) = &filter.department {
            query = query.filter(budget::Column::Department.eq(department.as_str()));
        }
        query
            .order_by_asc(budget::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<budget::Model>> {
        Budget::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self), fields(name = %draft.name))]
    async fn create(&self, draft: NewBudget) -> Result<budget::Model> {
        budget::Model::validate_draft(&draft)?;
        let model = budget::ActiveModel {
            name: Set(draft.name.trim().to_string()),
            category: Set(draft.category),
            allocated_amount: Set(draft.allocated_amount),
            spent_amount: Set(0.0),
            status: Set(draft.status.unwrap_or(BudgetStatus::Draft)),
            fiscal_year: Set(draft.fiscal_year),
            department: Set(draft.department),
            ..Default::default()
        };
        let created = model.insert(&self.db).await?;
        info!(id = created.id, "budget created");
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &i64, patch: BudgetPatch) -> Result<Option<budget::Model>> {
        budget::Model::validate_patch(&patch)?;
        super::update_by_id::<Budget, _>(&self.db, *id, &patch).await
    }

    /// Removes the budget together with the expenses charged to it.
    #[instrument(skip(self))]
    async fn delete(&self, id: &i64) -> Result<()> {
        let txn = self.db.begin().await?;
        let expenses = Expense::delete_many()
            .filter(expense::Column::BudgetId.eq(*id))
            .exec(&txn)
            .await?;
        Budget::delete_by_id(*id).exec(&txn).await?;
        txn.commit().await?;
        debug!(
            expenses_removed = expenses.rows_affected,
            "budget deleted"
        );
        Ok(())
    }
}
