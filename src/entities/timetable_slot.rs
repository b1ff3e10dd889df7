//! Timetable slot entity - One lesson period for a class on a named day.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Timetable slot database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timetable_slots")]
pub struct Model {
    /// Unique identifier for the slot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Class the slot belongs to
    pub class_id: i64,
    /// Day name (e.g., "Monday")
    pub day: String,
    /// Period number within the day, starting at 1
    pub period: i32,
    /// Subject taught
    pub subject: String,
    /// Staff id of the teacher, if assigned
    pub teacher_id: Option<i64>,
}

/// Defines relationships between `TimetableSlot` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each slot belongs to one class
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSlot {
    /// Class the slot belongs to
    pub class_id: i64,
    /// Day name
    pub day: String,
    /// Period number
    pub period: i32,
    /// Subject taught
    pub subject: String,
    /// Teacher, if assigned
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

/// Partial update of a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPatch {
    /// New subject
    pub subject: Option<String>,
    /// New teacher; `Some(None)` unassigns
    pub teacher_id: Option<Option<i64>>,
}

/// Query filter for slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    /// Class
    pub class_id: Option<i64>,
    /// Teacher
    pub teacher_id: Option<i64>,
}

impl Record for Model {
    type Id = i64;
    type Draft = NewSlot;
    type Patch = SlotPatch;
    type Filter = SlotFilter;
    const RESOURCE: &'static str = "timetable slot";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &SlotPatch) {
        if let Some(subject) = &patch.subject {
            self.subject.clone_from(subject);
        }
        if let Some(teacher) = patch.teacher_id {
            self.teacher_id = teacher;
        }
    }

    fn matches(&self, filter: &SlotFilter) -> bool {
        filter.class_id.is_none_or(|c| self.class_id == c)
            && filter
                .teacher_id
                .is_none_or(|t| self.teacher_id == Some(t))
    }

    fn validate_draft(draft: &NewSlot) -> errors::Result<()> {
        if draft.day.trim().is_empty() {
            return Err(errors::Error::validation("Slot day cannot be empty"));
        }
        if draft.subject.trim().is_empty() {
            return Err(errors::Error::validation("Slot subject cannot be empty"));
        }
        if draft.period < 1 {
            return Err(errors::Error::validation("Slot period starts at 1"));
        }
        Ok(())
    }
}

impl Materialize for Model {
    fn materialize(id: i64, draft: NewSlot) -> Self {
        Self {
            id,
            class_id: draft.class_id,
            day: draft.day,
            period: draft.period,
            subject: draft.subject,
            teacher_id: draft.teacher_id,
        }
    }
}
