//! Budget entity - A departmental spending allocation for one fiscal year.
//!
//! `spent_amount` may exceed `allocated_amount`; the "exceeded" state shown to
//! admins is derived from the amounts at read time rather than stored.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Science Lab Equipment")
    pub name: String,
    /// Spending category (e.g., "equipment", "salaries")
    pub category: String,
    /// Amount allocated for the fiscal year
    pub allocated_amount: f64,
    /// Amount spent so far
    pub spent_amount: f64,
    /// Stored lifecycle status
    pub status: BudgetStatus,
    /// Fiscal year the allocation belongs to
    pub fiscal_year: i32,
    /// Owning department
    pub department: String,
}

/// Lifecycle status of a budget.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Being prepared
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Awaiting approval
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Open for spending
    #[sea_orm(string_value = "active")]
    Active,
    /// Spending is above the allocation
    #[sea_orm(string_value = "exceeded")]
    Exceeded,
    /// No further spending
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// No relationships are navigated from budgets
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBudget {
    /// Display name
    pub name: String,
    /// Spending category
    pub category: String,
    /// Amount allocated
    pub allocated_amount: f64,
    /// Initial status; defaults to `Draft`
    #[serde(default)]
    pub status: Option<BudgetStatus>,
    /// Fiscal year
    pub fiscal_year: i32,
    /// Owning department
    pub department: String,
}

/// Partial update of a budget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPatch {
    /// New name
    pub name: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New allocation
    pub allocated_amount: Option<f64>,
    /// New spent amount
    pub spent_amount: Option<f64>,
    /// New status
    pub status: Option<BudgetStatus>,
    /// New department
    pub department: Option<String>,
}

/// Query filter for budgets. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetFilter {
    /// Stored status
    pub status: Option<BudgetStatus>,
    /// Fiscal year
    pub fiscal_year: Option<i32>,
    /// Department (exact match)
    pub department: Option<String>,
}

fn check_amount(amount: f64) -> errors::Result<()> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(errors::Error::InvalidAmount { amount });
    }
    Ok(())
}

impl Record for Model {
    type Id = i64;
    type Draft = NewBudget;
    type Patch = BudgetPatch;
    type Filter = BudgetFilter;
    const RESOURCE: &'static str = "budget";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &BudgetPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(category) = &patch.category {
            self.category.clone_from(category);
        }
        if let Some(allocated) = patch.allocated_amount {
            self.allocated_amount = allocated;
        }
        if let Some(spent) = patch.spent_amount {
            self.spent_amount = spent;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(department) = &patch.department {
            self.department.clone_from(department);
        }
    }

    fn matches(&self, filter: &BudgetFilter) -> bool {
        filter.status.is_none_or(|s| self.status == s)
            && filter.fiscal_year.is_none_or(|y| self.fiscal_year == y)
            && filter
                .department
                .as_deref()
                .is_none_or(|d| self.department == d)
    }

    fn validate_draft(draft: &NewBudget) -> errors::Result<()> {
        if draft.name.trim().is_empty() {
            return Err(errors::Error::validation("Budget name cannot be empty"));
        }
        check_amount(draft.allocated_amount)
    }

    fn validate_patch(patch: &BudgetPatch) -> errors::Result<()> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(errors::Error::validation("Budget name cannot be empty"));
        }
        if let Some(allocated) = patch.allocated_amount {
            check_amount(allocated)?;
        }
        if let Some(spent) = patch.spent_amount {
            check_amount(spent)?;
        }
        Ok(())
    }
}

impl Materialize for Model {
    fn materialize(id: i64, draft: NewBudget) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            category: draft.category,
            allocated_amount: draft.allocated_amount,
            spent_amount: 0.0,
            status: draft.status.unwrap_or(BudgetStatus::Draft),
            fiscal_year: draft.fiscal_year,
            department: draft.department,
        }
    }
}
