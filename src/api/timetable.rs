//! Timetable API - lesson slots per class.
//!
//! A class has at most one slot per day and period, and a teacher cannot be in
//! two classes in the same day and period.

use crate::{
    core::{source::DataSource, store::Record},
    entities::{
        Class, TimetableSlot,
        timetable_slot::{self, NewSlot, SlotFilter, SlotPatch},
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

/// Database-backed timetable source.
#[derive(Debug, Clone)]
pub struct TimetableApi {
    db: DatabaseConnection,
}

impl TimetableApi {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Every slot of one class, by day then period.
    ///
    /// Group the result with [`group_by_day`](crate::core::aggregate::group_by_day)
    /// for a weekday-ordered view.
    pub async fn get_by_class(&self, class_id: i64) -> Result<Vec<timetable_slot::Model>> {
        TimetableSlot::find()
            .filter(timetable_slot::Column::ClassId.eq(class_id))
            .order_by_asc(timetable_slot::Column::Day)
            .order_by_asc(timetable_slot::Column::Period)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }
}

/// Rejects a teacher already teaching elsewhere in the same day and period.
async fn check_teacher_free<C: ConnectionTrait>(
    db: &C,
    teacher_id: i64,
    day: &str,
    period: i32,
    except_slot: Option<i64>,
) -> Result<()> {
    let mut query = TimetableSlot::find()
        .filter(timetable_slot::Column::TeacherId.eq(teacher_id))
        .filter(timetable_slot::Column::Day.eq(day))
        .filter(timetable_slot::Column::Period.eq(period));
    if let Some(slot_id) = except_slot {
        query = query.filter(timetable_slot::Column::Id.ne(slot_id));
    }
    if let Some(clash) = query.one(db).await? {
        return Err(Error::validation(format!(
            "Teacher {teacher_id} already teaches class {} on {day} period {period}",
            clash.class_id
        )));
    }
    Ok(())
}

#[async_trait]
impl DataSource<timetable_slot::Model> for TimetableApi {
    async fn get_all(&self, filter: &SlotFilter) -> Result<Vec<timetable_slot::Model>> {
        let mut query = TimetableSlot::find();
        if let Some(class_id) = filter.class_id {
            query = query.filter(timetable_slot::Column::ClassId.eq(class_id));
        }
        if let Some(teacher_id) = filter.teacher_id {
            query = query.filter(timetable_slot::Column::TeacherId.eq(teacher_id));
        }
        query
            .order_by_asc(timetable_slot::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<timetable_slot::Model>> {
        TimetableSlot::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn create(&self, draft: NewSlot) -> Result<timetable_slot::Model> {
        timetable_slot::Model::validate_draft(&draft)?;
        let day = draft.day.trim().to_string();

        let txn = self.db.begin().await?;
        Class::find_by_id(draft.class_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("class", draft.class_id))?;

        let taken = TimetableSlot::find()
            .filter(timetable_slot::Column::ClassId.eq(draft.class_id))
            .filter(timetable_slot::Column::Day.eq(day.as_str()))
            .filter(timetable_slot::Column::Period.eq(draft.period))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(Error::validation(format!(
                "Class {} already has a lesson on {day} period {}",
                draft.class_id, draft.period
            )));
        }
        if let Some(teacher_id) = draft.teacher_id {
            check_teacher_free(&txn, teacher_id, &day, draft.period, None).await?;
        }

        let model = timetable_slot::ActiveModel {
            class_id: Set(draft.class_id),
            day: Set(day),
            period: Set(draft.period),
            subject: Set(draft.subject.trim().to_string()),
            teacher_id: Set(draft.teacher_id),
            ..Default::default()
        };
        let created = model.insert(&txn).await?;
        txn.commit().await?;
        debug!(id = created.id, "slot created");
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &i64, patch: SlotPatch) -> Result<Option<timetable_slot::Model>> {
        timetable_slot::Model::validate_patch(&patch)?;
        let txn = self.db.begin().await?;
        if let Some(Some(teacher_id)) = patch.teacher_id
            && let Some(slot) = TimetableSlot::find_by_id(*id).one(&txn).await?
        {
            check_teacher_free(&txn, teacher_id, &slot.day, slot.period, Some(slot.id)).await?;
        }
        let updated = super::update_by_id::<TimetableSlot, _>(&txn, *id, &patch).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: &i64) -> Result<()> {
        TimetableSlot::delete_by_id(*id).exec(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::aggregate::group_by_day, test_utils::*};

    #[tokio::test]
    async fn test_get_by_class_only_returns_that_class() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_class(&db, "Grade 5 - A").await?;
        let b = create_test_class(&db, "Grade 5 - B").await?;
        create_test_slot(&db, a.id, "Monday", 2).await?;
        create_test_slot(&db, a.id, "Monday", 1).await?;
        create_test_slot(&db, b.id, "Monday", 1).await?;

        let api = TimetableApi::new(db);
        let slots = api.get_by_class(a.id).await?;
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.class_id == a.id));
        assert_eq!(slots[0].period, 1);

        let week = group_by_day(&slots, &["Monday", "Tuesday"]);
        assert_eq!(week[0].slots.len(), 2);
        assert!(week[1].slots.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_double_booked_period() -> Result<()> {
        let db = setup_test_db().await?;
        let class = create_test_class(&db, "Grade 5 - A").await?;
        create_test_slot(&db, class.id, "Monday", 1).await?;

        let result = create_test_slot(&db, class.id, "Monday", 1).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_teacher_in_two_places() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_class(&db, "Grade 5 - A").await?;
        let b = create_test_class(&db, "Grade 5 - B").await?;
        let api = TimetableApi::new(db);
        let lesson = |class_id| NewSlot {
            class_id,
            day: "Tuesday".to_string(),
            period: 3,
            subject: "Maths".to_string(),
            teacher_id: Some(21),
        };
        api.create(lesson(a.id)).await?;
        assert!(matches!(
            api.create(lesson(b.id)).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_creates_for_one_period_book_once() -> Result<()> {
        let db = setup_test_db().await?;
        let class = create_test_class(&db, "Grade 5 - A").await?;
        let api = TimetableApi::new(db);
        let lesson = |subject: &str| NewSlot {
            class_id: class.id,
            day: "Friday".to_string(),
            period: 2,
            subject: subject.to_string(),
            teacher_id: None,
        };

        let (first, second) = tokio::join!(api.create(lesson("Art")), api.create(lesson("Music")));
        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);
        assert_eq!(api.get_by_class(class.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reassigning_teacher_checks_clash() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_class(&db, "Grade 5 - A").await?;
        let b = create_test_class(&db, "Grade 5 - B").await?;
        let api = TimetableApi::new(db.clone());
        api.create(NewSlot {
            class_id: a.id,
            day: "Monday".to_string(),
            period: 1,
            subject: "Maths".to_string(),
            teacher_id: Some(21),
        })
        .await?;
        let other = create_test_slot(&db, b.id, "Monday", 1).await?;

        let clash = api
            .update(
                &other.id,
                SlotPatch {
                    teacher_id: Some(Some(21)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(clash, Err(Error::Validation { .. })));

        let assigned = api
            .update(
                &other.id,
                SlotPatch {
                    teacher_id: Some(Some(22)),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(assigned.and_then(|s| s.teacher_id), Some(22));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_period_zero_and_unknown_class() -> Result<()> {
        let db = setup_test_db().await?;
        let class = create_test_class(&db, "Grade 5 - A").await?;
        assert!(matches!(
            create_test_slot(&db, class.id, "Monday", 0).await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            create_test_slot(&db, 404, "Monday", 1).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
