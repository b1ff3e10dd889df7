//! Class/template mapping entity - Which fee template a class is billed with.
//!
//! The table is keyed by `class_id`, so a class can never hold two mappings;
//! assigning a new template replaces the old row.

use crate::core::store::Record;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Class/template mapping database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "class_template_mappings")]
pub struct Model {
    /// Class being billed; also the primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub class_id: i64,
    /// Template assigned
    pub template_id: i64,
    /// Students in the class at assignment time
    pub student_count: i64,
    /// Template total at assignment time
    pub total_amount: f64,
    /// When the assignment was made
    pub assigned_at: DateTimeUtc,
}

/// Defines relationships between `ClassTemplateMapping` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each mapping points at one template
    #[sea_orm(
        belongs_to = "super::fee_template::Entity",
        from = "Column::TemplateId",
        to = "super::fee_template::Column::Id"
    )]
    Template,
    /// Each mapping belongs to one class
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
}

impl Related<super::fee_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for assigning a template to one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMapping {
    /// Class to bill
    pub class_id: i64,
    /// Template to assign
    pub template_id: i64,
}

/// Re-targets a mapping at another template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingPatch {
    /// New template
    pub template_id: Option<i64>,
}

/// Query filter for mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingFilter {
    /// Template assigned
    pub template_id: Option<i64>,
}

impl Record for Model {
    type Id = i64;
    type Draft = NewMapping;
    type Patch = MappingPatch;
    type Filter = MappingFilter;
    const RESOURCE: &'static str = "class template mapping";

    fn id(&self) -> i64 {
        self.class_id
    }

    fn apply_patch(&mut self, patch: &MappingPatch) {
        if let Some(template_id) = patch.template_id {
            self.template_id = template_id;
        }
    }

    fn matches(&self, filter: &MappingFilter) -> bool {
        filter.template_id.is_none_or(|t| self.template_id == t)
    }
}
