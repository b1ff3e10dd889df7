//! Class API - classes and class teacher assignment.

use crate::{
    core::{source::DataSource, store::Record},
    entities::{
        Class, TemplateMapping, TimetableSlot,
        class::{self, ClassFilter, ClassPatch, NewClass},
        template_mapping, timetable_slot,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Database-backed class source.
#[derive(Debug, Clone)]
pub struct ClassApi {
    db: DatabaseConnection,
}

impl ClassApi {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Makes `teacher_id` the class teacher of `class_id`, replacing any
    /// previous assignment.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when the class does not exist.
    #[instrument(skip(self))]
    pub async fn assign_teacher(&self, class_id: i64, teacher_id: i64) -> Result<class::Model> {
        let current = Class::find_by_id(class_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("class", class_id))?;
        let previous = current.class_teacher_id;

        let mut active: class::ActiveModel = current.into();
        active.class_teacher_id = Set(Some(teacher_id));
        let updated = active.update(&self.db).await?;
        info!(?previous, "class teacher assigned");
        Ok(updated)
    }
}

#[async_trait]
impl DataSource<class::Model> for ClassApi {
    async fn get_all(&self, filter: &ClassFilter) -> Result<Vec<class::Model>> {
        let mut query = Class::find();
        if let Some(grade) = filter.grade_level {
            query = query.filter(class::Column::GradeLevel.eq(grade));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(class::Column::IsActive.eq(active));
        }
        query
            .order_by_asc(class::Column::GradeLevel)
            .order_by_asc(class::Column::Name)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<class::Model>> {
        Class::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn create(&self, draft: NewClass) -> Result<class::Model> {
        class::Model::validate_draft(&draft)?;
        let model = class::ActiveModel {
            name: Set(draft.name.trim().to_string()),
            grade_level: Set(draft.grade_level),
            is_active: Set(true),
            class_teacher_id: Set(draft.class_teacher_id),
            total_students: Set(draft.total_students),
            capacity: Set(draft.capacity),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &i64, patch: ClassPatch) -> Result<Option<class::Model>> {
        class::Model::validate_patch(&patch)?;
        super::update_by_id::<Class, _>(&self.db, *id, &patch).await
    }

    /// Removes the class with its timetable and fee mapping.
    #[instrument(skip(self))]
    async fn delete(&self, id: &i64) -> Result<()> {
        let txn = self.db.begin().await?;
        TimetableSlot::delete_many()
            .filter(timetable_slot::Column::ClassId.eq(*id))
            .exec(&txn)
            .await?;
        TemplateMapping::delete_many()
            .filter(template_mapping::Column::ClassId.eq(*id))
            .exec(&txn)
            .await?;
        Class::delete_by_id(*id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_assign_teacher() -> Result<()> {
        let db = setup_test_db().await?;
        let api = ClassApi::new(db.clone());
        let class = create_test_class(&db, "Grade 5 - A").await?;
        assert_eq!(class.class_teacher_id, None);

        let assigned = api.assign_teacher(class.id, 11).await?;
        assert_eq!(assigned.class_teacher_id, Some(11));

        let reassigned = api.assign_teacher(class.id, 12).await?;
        assert_eq!(reassigned.class_teacher_id, Some(12));
        assert_eq!(reassigned.name, "Grade 5 - A");
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_teacher_missing_class() -> Result<()> {
        let db = setup_test_db().await?;
        let api = ClassApi::new(db);
        assert!(matches!(
            api.assign_teacher(404, 1).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unassign_through_patch() -> Result<()> {
        let db = setup_test_db().await?;
        let api = ClassApi::new(db.clone());
        let class = create_test_class(&db, "Grade 6 - B").await?;
        api.assign_teacher(class.id, 3).await?;

        let cleared = api
            .update(
                &class.id,
                ClassPatch {
                    class_teacher_id: Some(None),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| Error::not_found("class", class.id))?;
        assert_eq!(cleared.class_teacher_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_by_grade() -> Result<()> {
        let db = setup_test_db().await?;
        let api = ClassApi::new(db.clone());
        create_test_class(&db, "Grade 5 - A").await?;
        api.create(NewClass {
            name: "Grade 7 - A".to_string(),
            grade_level: 7,
            class_teacher_id: None,
            total_students: 20,
            capacity: 30,
        })
        .await?;

        let seventh = api
            .get_all(&ClassFilter {
                grade_level: Some(7),
                ..Default::default()
            })
            .await?;
        assert_eq!(seventh.len(), 1);
        assert_eq!(seventh[0].name, "Grade 7 - A");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades_to_slots() -> Result<()> {
        let db = setup_test_db().await?;
        let class = create_test_class(&db, "Grade 5 - A").await?;
        create_test_slot(&db, class.id, "Monday", 1).await?;

        let api = ClassApi::new(db.clone());
        api.delete(&class.id).await?;
        assert!(api.get_by_id(&class.id).await?.is_none());
        assert!(TimetableSlot::find().all(&db).await?.is_empty());
        Ok(())
    }
}
