//! Shared test utilities.
//!
//! Helpers for setting up in-memory test databases, building models without a
//! database, and creating test entities with sensible defaults.

use crate::{
    api::{ClassApi, ExpenseApi, FeeApi, InvoiceApi, TimetableApi},
    core::source::DataSource,
    entities::{
        budget::{self, BudgetStatus, NewBudget},
        class::{self, NewClass},
        expense::{self, NewExpense},
        fee_component::{self, NewFeeComponent},
        fee_template::{self, NewFeeTemplate},
        invoice::{self, NewInvoice},
        timetable_slot::{self, NewSlot},
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Installs a test-writer tracing subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds an active 2026 budget without touching a database.
pub fn budget_model(id: i64, name: &str, allocated: f64, spent: f64) -> budget::Model {
    budget::Model {
        id,
        name: name.to_string(),
        category: "supplies".to_string(),
        allocated_amount: allocated,
        spent_amount: spent,
        status: BudgetStatus::Active,
        fiscal_year: 2026,
        department: "science".to_string(),
    }
}

/// Builds a grade 5 class without touching a database.
pub fn class_model(
    id: i64,
    name: &str,
    total_students: i64,
    class_teacher_id: Option<i64>,
) -> class::Model {
    class::Model {
        id,
        name: name.to_string(),
        grade_level: 5,
        is_active: true,
        class_teacher_id,
        total_students,
        capacity: 35,
    }
}

/// Builds a timetable slot for class 1 without touching a database.
pub fn slot_model(id: i64, day: &str, period: i32, subject: &str) -> timetable_slot::Model {
    timetable_slot::Model {
        id,
        class_id: 1,
        day: day.to_string(),
        period,
        subject: subject.to_string(),
        teacher_id: None,
    }
}

/// Budget payload with sensible defaults.
///
/// # Defaults
/// * `category`: "supplies"
/// * `status`: Active
/// * `fiscal_year`: 2026
/// * `department`: "science"
pub fn new_budget(name: &str, allocated: f64) -> NewBudget {
    NewBudget {
        name: name.to_string(),
        category: "supplies".to_string(),
        allocated_amount: allocated,
        status: Some(BudgetStatus::Active),
        fiscal_year: 2026,
        department: "science".to_string(),
    }
}

/// Creates a test budget with an allocation of 1000.0.
pub async fn create_test_budget(db: &DatabaseConnection, name: &str) -> Result<budget::Model> {
    create_custom_budget(db, name, 1000.0).await
}

/// Creates a test budget with a custom allocation.
pub async fn create_custom_budget(
    db: &DatabaseConnection,
    name: &str,
    allocated: f64,
) -> Result<budget::Model> {
    crate::api::BudgetApi::new(db.clone())
        .create(new_budget(name, allocated))
        .await
}

/// Sets up a complete test environment with a budget.
/// Returns (db, budget) for common test scenarios.
pub async fn setup_with_budget() -> Result<(DatabaseConnection, budget::Model)> {
    let db = setup_test_db().await?;
    let budget = create_test_budget(&db, "Test Budget").await?;
    Ok((db, budget))
}

/// Logs a pending test expense.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    budget_id: i64,
    amount: f64,
) -> Result<expense::Model> {
    ExpenseApi::new(db.clone())
        .log_expense(NewExpense {
            budget_id,
            amount,
            description: "Test expense".to_string(),
        })
        .await
}

/// Issues a pending test invoice due on 2026-09-01.
pub async fn create_test_invoice(
    db: &DatabaseConnection,
    student_id: i64,
    amount_due: f64,
) -> Result<invoice::Model> {
    InvoiceApi::new(db.clone())
        .create(NewInvoice {
            student_id,
            amount_due,
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap_or_default(),
            status: None,
        })
        .await
}

/// Creates a grade 5 test class with 30 students and no class teacher.
pub async fn create_test_class(db: &DatabaseConnection, name: &str) -> Result<class::Model> {
    ClassApi::new(db.clone())
        .create(NewClass {
            name: name.to_string(),
            grade_level: 5,
            class_teacher_id: None,
            total_students: 30,
            capacity: 35,
        })
        .await
}

/// Creates a "General" lesson with no teacher.
pub async fn create_test_slot(
    db: &DatabaseConnection,
    class_id: i64,
    day: &str,
    period: i32,
) -> Result<timetable_slot::Model> {
    TimetableApi::new(db.clone())
        .create(NewSlot {
            class_id,
            day: day.to_string(),
            period,
            subject: "General".to_string(),
            teacher_id: None,
        })
        .await
}

/// Creates a 2026/27 fee template.
pub async fn create_test_template(
    db: &DatabaseConnection,
    name: &str,
    total_amount: f64,
) -> Result<fee_template::Model> {
    FeeApi::new(db.clone())
        .create(NewFeeTemplate {
            name: name.to_string(),
            academic_year: "2026/27".to_string(),
            total_amount,
        })
        .await
}

/// Adds a component to a template.
pub async fn create_test_component(
    db: &DatabaseConnection,
    template_id: i64,
    name: &str,
    amount: f64,
) -> Result<fee_component::Model> {
    FeeApi::new(db.clone())
        .create(NewFeeComponent {
            template_id,
            name: name.to_string(),
            amount,
        })
        .await
}
