//! Expense entity - A spending request logged against a budget.
//!
//! Expenses start `Pending` and move through [`ApprovalStatus`] only by explicit
//! reviewer action. An approved expense is added to its budget's spent amount.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Budget this expense is charged to
    pub budget_id: i64,
    /// Amount requested (always positive)
    pub amount: f64,
    /// What the money is for
    pub description: String,
    /// Approval state
    pub status: ApprovalStatus,
    /// When the expense was logged
    pub logged_at: DateTimeUtc,
}

/// Approval workflow state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a reviewer
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted; counted against the budget
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Refused
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Passed up to a senior reviewer
    #[sea_orm(string_value = "escalated")]
    Escalated,
    /// Sent back to the requester for details
    #[sea_orm(string_value = "needs_info")]
    NeedsInfo,
}

impl ApprovalStatus {
    /// Wire/storage name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
            Self::NeedsInfo => "needs_info",
        }
    }

    /// Whether a reviewer may move an expense from `self` to `next`.
    ///
    /// Pending can go anywhere but back to pending; escalated and needs-info can
    /// return to pending or be decided; approved and rejected are final.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => !matches!(next, Self::Pending),
            Self::Escalated | Self::NeedsInfo => {
                matches!(next, Self::Pending | Self::Approved | Self::Rejected)
            }
            Self::Approved | Self::Rejected => false,
        }
    }

    /// Checks a transition, returning [`errors::Error::InvalidTransition`] when it is not allowed.
    pub fn transition_to(self, next: Self) -> errors::Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(errors::Error::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense belongs to one budget
    #[sea_orm(
        belongs_to = "super::budget::Entity",
        from = "Column::BudgetId",
        to = "super::budget::Column::Id"
    )]
    Budget,
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for logging an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    /// Budget to charge
    pub budget_id: i64,
    /// Amount (must be positive)
    pub amount: f64,
    /// What the money is for
    pub description: String,
}

/// Partial update of an expense. Only pending expenses may be edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    /// New amount
    pub amount: Option<f64>,
    /// New description
    pub description: Option<String>,
}

/// Query filter for expenses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Budget the expense is charged to
    pub budget_id: Option<i64>,
    /// Approval state
    pub status: Option<ApprovalStatus>,
}

fn check_amount(amount: f64) -> errors::Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(errors::Error::InvalidAmount { amount });
    }
    Ok(())
}

impl Record for Model {
    type Id = i64;
    type Draft = NewExpense;
    type Patch = ExpensePatch;
    type Filter = ExpenseFilter;
    const RESOURCE: &'static str = "expense";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &ExpensePatch) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
    }

    fn matches(&self, filter: &ExpenseFilter) -> bool {
        filter.budget_id.is_none_or(|b| self.budget_id == b)
            && filter.status.is_none_or(|s| self.status == s)
    }

    fn validate_draft(draft: &NewExpense) -> errors::Result<()> {
        if draft.description.trim().is_empty() {
            return Err(errors::Error::validation("Expense description cannot be empty"));
        }
        check_amount(draft.amount)
    }

    fn validate_patch(patch: &ExpensePatch) -> errors::Result<()> {
        if patch
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(errors::Error::validation("Expense description cannot be empty"));
        }
        patch.amount.map_or(Ok(()), check_amount)
    }
}

impl Materialize for Model {
    fn materialize(id: i64, draft: NewExpense) -> Self {
        Self {
            id,
            budget_id: draft.budget_id,
            amount: draft.amount,
            description: draft.description.trim().to_string(),
            status: ApprovalStatus::Pending,
            logged_at: chrono::Utc::now(),
        }
    }
}
