//! Class entity - A teaching group with an optional class teacher.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Class database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    /// Unique identifier for the class
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Grade 5 - A")
    pub name: String,
    /// Grade level
    pub grade_level: i32,
    /// Whether the class is running this term
    pub is_active: bool,
    /// Staff id of the class teacher, if assigned
    pub class_teacher_id: Option<i64>,
    /// Enrolled students
    pub total_students: i64,
    /// Seats available
    pub capacity: i64,
}

/// Defines relationships between Class and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One class has many timetable slots
    #[sea_orm(has_many = "super::timetable_slot::Entity")]
    TimetableSlots,
}

impl Related<super::timetable_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimetableSlots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for creating a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClass {
    /// Display name
    pub name: String,
    /// Grade level
    pub grade_level: i32,
    /// Staff id of the class teacher
    #[serde(default)]
    pub class_teacher_id: Option<i64>,
    /// Enrolled students
    pub total_students: i64,
    /// Seats available
    pub capacity: i64,
}

/// Partial update of a class. `class_teacher_id: Some(None)` unassigns the teacher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPatch {
    /// New name
    pub name: Option<String>,
    /// New active flag
    pub is_active: Option<bool>,
    /// New class teacher
    pub class_teacher_id: Option<Option<i64>>,
    /// New enrolment count
    pub total_students: Option<i64>,
    /// New capacity
    pub capacity: Option<i64>,
}

/// Query filter for classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFilter {
    /// Grade level
    pub grade_level: Option<i32>,
    /// Active flag
    pub is_active: Option<bool>,
}

fn check_count(field: &str, value: i64) -> errors::Result<()> {
    if value < 0 {
        return Err(errors::Error::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

impl Record for Model {
    type Id = i64;
    type Draft = NewClass;
    type Patch = ClassPatch;
    type Filter = ClassFilter;
    const RESOURCE: &'static str = "class";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &ClassPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(teacher) = patch.class_teacher_id {
            self.class_teacher_id = teacher;
        }
        if let Some(students) = patch.total_students {
            self.total_students = students;
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
    }

    fn matches(&self, filter: &ClassFilter) -> bool {
        filter.grade_level.is_none_or(|g| self.grade_level == g)
            && filter.is_active.is_none_or(|a| self.is_active == a)
    }

    fn validate_draft(draft: &NewClass) -> errors::Result<()> {
        if draft.name.trim().is_empty() {
            return Err(errors::Error::validation("Class name cannot be empty"));
        }
        check_count("total_students", draft.total_students)?;
        check_count("capacity", draft.capacity)
    }

    fn validate_patch(patch: &ClassPatch) -> errors::Result<()> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(errors::Error::validation("Class name cannot be empty"));
        }
        if let Some(students) = patch.total_students {
            check_count("total_students", students)?;
        }
        patch
            .capacity
            .map_or(Ok(()), |c| check_count("capacity", c))
    }
}

impl Materialize for Model {
    fn materialize(id: i64, draft: NewClass) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            grade_level: draft.grade_level,
            is_active: true,
            class_teacher_id: draft.class_teacher_id,
            total_students: draft.total_students,
            capacity: draft.capacity,
        }
    }
}
