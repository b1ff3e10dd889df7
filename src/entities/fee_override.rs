//! Student fee override entity - A per-student adjustment of one fee component.
//!
//! An inactive override is a full opt-out: the component contributes nothing to
//! the student's fees whatever `override_amount` holds.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student fee override database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_fee_overrides")]
pub struct Model {
    /// Unique identifier for the override
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the override applies to
    pub student_id: i64,
    /// Component being overridden
    pub component_id: i64,
    /// Component amount when the override was made
    pub original_amount: f64,
    /// Amount the student pays instead
    pub override_amount: f64,
    /// `false` means the student opts out of the component entirely
    pub is_active: bool,
    /// Why the override was granted
    pub reason: String,
}

impl Model {
    /// `original_amount - override_amount`; positive is a discount, negative a surcharge.
    #[must_use]
    pub fn adjustment(&self) -> f64 {
        crate::core::aggregate::discount_adjustment(self.original_amount, self.override_amount)
    }

    /// What the student actually pays for the component.
    #[must_use]
    pub const fn effective_amount(&self) -> f64 {
        if self.is_active {
            self.override_amount
        } else {
            0.0
        }
    }
}

/// Defines relationships between `StudentFeeOverride` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each override targets one component
    #[sea_orm(
        belongs_to = "super::fee_component::Entity",
        from = "Column::ComponentId",
        to = "super::fee_component::Column::Id"
    )]
    Component,
}

impl Related<super::fee_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating an override for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeeOverride {
    /// Student the override applies to
    pub student_id: i64,
    /// Component being overridden
    pub component_id: i64,
    /// Amount the student pays instead
    pub override_amount: f64,
    /// `false` opts the student out of the component
    pub is_active: bool,
    /// Why the override was granted
    pub reason: String,
}

/// Override terms applied to many students at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideTerms {
    /// Component being overridden
    pub component_id: i64,
    /// Amount each student pays instead
    pub override_amount: f64,
    /// `false` opts the students out of the component
    pub is_active: bool,
    /// Why the override was granted
    pub reason: String,
}

impl OverrideTerms {
    /// Terms for a single student.
    #[must_use]
    pub fn for_student(&self, student_id: i64) -> NewFeeOverride {
        NewFeeOverride {
            student_id,
            component_id: self.component_id,
            override_amount: self.override_amount,
            is_active: self.is_active,
            reason: self.reason.clone(),
        }
    }
}

/// Partial update of an override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeOverridePatch {
    /// New override amount
    pub override_amount: Option<f64>,
    /// New active flag
    pub is_active: Option<bool>,
    /// New reason
    pub reason: Option<String>,
}

/// Query filter for overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeOverrideFilter {
    /// Student
    pub student_id: Option<i64>,
    /// Component
    pub component_id: Option<i64>,
    /// Active flag
    pub is_active: Option<bool>,
}

fn check_override_amount(amount: f64) -> errors::Result<()> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(errors::Error::InvalidAmount { amount });
    }
    Ok(())
}

impl Record for Model {
    type Id = i64;
    type Draft = NewFeeOverride;
    type Patch = FeeOverridePatch;
    type Filter = FeeOverrideFilter;
    const RESOURCE: &'static str = "fee override";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &FeeOverridePatch) {
        if let Some(amount) = patch.override_amount {
            self.override_amount = amount;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(reason) = &patch.reason {
            self.reason.clone_from(reason);
        }
    }

    fn matches(&self, filter: &FeeOverrideFilter) -> bool {
        filter.student_id.is_none_or(|s| self.student_id == s)
            && filter.component_id.is_none_or(|c| self.component_id == c)
            && filter.is_active.is_none_or(|a| self.is_active == a)
    }

    fn validate_draft(draft: &NewFeeOverride) -> errors::Result<()> {
        if draft.reason.trim().is_empty() {
            return Err(errors::Error::validation("Override reason cannot be empty"));
        }
        check_override_amount(draft.override_amount)
    }

    fn validate_patch(patch: &FeeOverridePatch) -> errors::Result<()> {
        if patch.reason.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(errors::Error::validation("Override reason cannot be empty"));
        }
        patch
            .override_amount
            .map_or(Ok(()), check_override_amount)
    }
}

/// The mock provider has no component table, so the original amount starts at
/// the requested override amount.
impl Materialize for Model {
    fn materialize(id: i64, draft: NewFeeOverride) -> Self {
        Self {
            id,
            student_id: draft.student_id,
            component_id: draft.component_id,
            original_amount: draft.override_amount,
            override_amount: draft.override_amount,
            is_active: draft.is_active,
            reason: draft.reason,
        }
    }
}
