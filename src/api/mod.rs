//! Database-backed data sources.
//!
//! Each API wraps a [`DatabaseConnection`] and implements
//! [`DataSource`](crate::core::source::DataSource) for its resources, plus the
//! resource-specific operations (bulk assignment, payments, expense review) the
//! dashboard calls through [`commit`](crate::core::coordinator::commit).
//! Multi-row writes run inside a database transaction.

/// Budgets
pub mod budget;
/// Classes and teacher assignment
pub mod class;
/// Expense logging and review
pub mod expense;
/// Fee templates, components, overrides and class mappings
pub mod fee;
/// Invoices and payments
pub mod invoice;
/// Timetable slots
pub mod timetable;

pub use budget::BudgetApi;
pub use class::ClassApi;
pub use expense::ExpenseApi;
pub use fee::FeeApi;
pub use invoice::InvoiceApi;
pub use timetable::TimetableApi;

use crate::{core::store::Record, errors::Result};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    PrimaryKeyTrait,
};

/// Loads a row, merges `patch` into it and writes every column back.
///
/// Returns `None` when the row does not exist. The merged row must pass
/// [`Record::validate_state`] before anything is written.
pub(crate) async fn update_by_id<E, C>(
    db: &C,
    id: i64,
    patch: &<E::Model as Record>::Patch,
) -> Result<Option<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Record + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i64>,
{
    let Some(mut model) = E::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    model.apply_patch(patch);
    model.validate_state()?;
    let saved = model.into_active_model().reset_all().update(db).await?;
    Ok(Some(saved))
}
