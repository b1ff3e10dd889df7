//! Fee template entity - A named fee schedule assigned to whole classes.
//!
//! `total_amount` is the sum billed per student; it is copied onto class
//! mappings when the template is assigned.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fee template database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fee_templates")]
pub struct Model {
    /// Unique identifier for the template
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Primary Standard 2026")
    pub name: String,
    /// Academic year label (e.g., "2026/27")
    pub academic_year: String,
    /// Total billed per student
    pub total_amount: f64,
}

/// Defines relationships between `FeeTemplate` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One template has many components
    #[sea_orm(has_many = "super::fee_component::Entity")]
    Components,
}

impl Related<super::fee_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Components.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeeTemplate {
    /// Display name
    pub name: String,
    /// Academic year label
    pub academic_year: String,
    /// Total billed per student
    pub total_amount: f64,
}

/// Partial update of a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeTemplatePatch {
    /// New name
    pub name: Option<String>,
    /// New total
    pub total_amount: Option<f64>,
}

/// Query filter for templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeTemplateFilter {
    /// Academic year label
    pub academic_year: Option<String>,
}

impl Record for Model {
    type Id = i64;
    type Draft = NewFeeTemplate;
    type Patch = FeeTemplatePatch;
    type Filter = FeeTemplateFilter;
    const RESOURCE: &'static str = "fee template";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &FeeTemplatePatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(total) = patch.total_amount {
            self.total_amount = total;
        }
    }

    fn matches(&self, filter: &FeeTemplateFilter) -> bool {
        filter
            .academic_year
            .as_deref()
            .is_none_or(|y| self.academic_year == y)
    }

    fn validate_draft(draft: &NewFeeTemplate) -> errors::Result<()> {
        if draft.name.trim().is_empty() {
            return Err(errors::Error::validation("Template name cannot be empty"));
        }
        if draft.total_amount < 0.0 || !draft.total_amount.is_finite() {
            return Err(errors::Error::InvalidAmount {
                amount: draft.total_amount,
            });
        }
        Ok(())
    }

    fn validate_patch(patch: &FeeTemplatePatch) -> errors::Result<()> {
        match patch.total_amount {
            Some(amount) if amount < 0.0 || !amount.is_finite() => {
                Err(errors::Error::InvalidAmount { amount })
            }
            _ => Ok(()),
        }
    }
}

impl Materialize for Model {
    fn materialize(id: i64, draft: NewFeeTemplate) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            academic_year: draft.academic_year,
            total_amount: draft.total_amount,
        }
    }
}
