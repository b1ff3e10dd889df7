//! Fee component entity - One line item (tuition, transport, ...) of a fee template.

use crate::{
    core::store::Record,
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fee component database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fee_components")]
pub struct Model {
    /// Unique identifier for the component
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Template this component belongs to
    pub template_id: i64,
    /// Display name
    pub name: String,
    /// Standard amount per student
    pub amount: f64,
}

/// Defines relationships between `FeeComponent` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each component belongs to one template
    #[sea_orm(
        belongs_to = "super::fee_template::Entity",
        from = "Column::TemplateId",
        to = "super::fee_template::Column::Id"
    )]
    Template,
}

impl Related<super::fee_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for adding a component to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeeComponent {
    /// Owning template
    pub template_id: i64,
    /// Display name
    pub name: String,
    /// Standard amount
    pub amount: f64,
}

/// Partial update of a component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeComponentPatch {
    /// New name
    pub name: Option<String>,
    /// New amount
    pub amount: Option<f64>,
}

/// Query filter for components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeComponentFilter {
    /// Owning template
    pub template_id: Option<i64>,
}

impl Record for Model {
    type Id = i64;
    type Draft = NewFeeComponent;
    type Patch = FeeComponentPatch;
    type Filter = FeeComponentFilter;
    const RESOURCE: &'static str = "fee component";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &FeeComponentPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
    }

    fn matches(&self, filter: &FeeComponentFilter) -> bool {
        filter.template_id.is_none_or(|t| self.template_id == t)
    }

    fn validate_draft(draft: &NewFeeComponent) -> errors::Result<()> {
        if draft.name.trim().is_empty() {
            return Err(errors::Error::validation("Component name cannot be empty"));
        }
        if draft.amount < 0.0 || !draft.amount.is_finite() {
            return Err(errors::Error::InvalidAmount {
                amount: draft.amount,
            });
        }
        Ok(())
    }

    fn validate_patch(patch: &FeeComponentPatch) -> errors::Result<()> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(errors::Error::validation("Component name cannot be empty"));
        }
        match patch.amount {
            Some(amount) if amount < 0.0 || !amount.is_finite() => {
                Err(errors::Error::InvalidAmount { amount })
            }
            _ => Ok(()),
        }
    }
}
