//! Report generation and display helpers.
//!
//! Turns derived values from [`crate::core::aggregate`] into the strings the
//! dashboard shows: utilization with its "N/A" sentinel, signed discount
//! adjustments, over-budget remaining amounts and text progress bars. The
//! database-backed [`generate_budget_report`] gathers a budget with its recent
//! expenses into one structure.

use crate::{
    api::ExpenseApi,
    config::settings::Thresholds,
    core::aggregate::{self, UtilizationTier},
    entities::{Budget, budget, expense},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, EntityTrait};

/// A budget with its spending analysis.
#[derive(Debug, Clone)]
pub struct BudgetReport {
    /// The budget being reported on
    pub budget: budget::Model,
    /// Status after derivation (may be `Exceeded`)
    pub effective_status: budget::BudgetStatus,
    /// Utilization percentage, `None` when nothing is allocated
    pub utilization: Option<f64>,
    /// Utilization tier under the configured thresholds
    pub tier: UtilizationTier,
    /// Allocation minus spending; negative when over budget
    pub remaining: f64,
    /// Most recent expenses logged against the budget
    pub recent_expenses: Vec<expense::Model>,
}

/// Generates a report for a specific budget.
///
/// # Arguments
/// * `db` - Database connection
/// * `budget_id` - ID of the budget to report on
/// * `expense_limit` - Maximum number of recent expenses to include (default 10)
/// * `thresholds` - Utilization tiers
pub async fn generate_budget_report(
    db: &DatabaseConnection,
    budget_id: i64,
    expense_limit: Option<u64>,
    thresholds: &Thresholds,
) -> Result<BudgetReport> {
    let budget = Budget::find_by_id(budget_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("budget", budget_id))?;

    let limit = expense_limit.unwrap_or(10);
    let recent_expenses: Vec<expense::Model> = ExpenseApi::new(db.clone())
        .for_budget(budget_id)
        .await?
        .into_iter()
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect();

    let utilization = aggregate::budget_utilization(&budget);
    Ok(BudgetReport {
        effective_status: aggregate::effective_budget_status(&budget),
        utilization,
        tier: aggregate::utilization_tier(utilization, thresholds),
        remaining: aggregate::remaining(budget.allocated_amount, budget.spent_amount),
        recent_expenses,
        budget,
    })
}

/// Formats a utilization percentage; undefined utilization renders as `"N/A"`.
#[must_use]
pub fn format_utilization(utilization: Option<f64>) -> String {
    utilization.map_or_else(|| "N/A".to_string(), |pct| format!("{pct:.1}%"))
}

/// Formats a remaining amount; negative values read as "Over budget by".
#[must_use]
pub fn format_remaining(remaining: f64) -> String {
    if remaining < 0.0 {
        format!("Over budget by ${:.2}", remaining.abs())
    } else {
        format!("${remaining:.2} remaining")
    }
}

/// Formats a discount adjustment from the student's point of view.
///
/// A positive adjustment lowers the bill and renders with a minus sign
/// (`"-$300.00"`); a negative one is a surcharge and renders with a plus sign.
#[must_use]
pub fn format_adjustment(adjustment: f64) -> String {
    if adjustment > 0.0 {
        format!("-${adjustment:.2}")
    } else if adjustment < 0.0 {
        format!("+${:.2}", adjustment.abs())
    } else {
        "$0.00".to_string()
    }
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`. Undefined
/// utilization renders an empty bar labelled `N/A`.
#[must_use]
pub fn format_progress_bar(utilization: Option<f64>, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let Some(pct) = utilization else {
        return format!("[{}] N/A", "░".repeat(length));
    };
    let clamped = pct.clamp(0.0, 100.0);

    // clamped ∈ [0, 100] and length is small, so the product fits a usize.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("[{}{}] {pct:.1}%", "█".repeat(filled), "░".repeat(empty))
}

/// Short label for a utilization tier.
#[must_use]
pub const fn tier_label(tier: UtilizationTier) -> &'static str {
    match tier {
        UtilizationTier::Undefined => "no allocation",
        UtilizationTier::Normal => "ok",
        UtilizationTier::Warning => "warning",
        UtilizationTier::Critical => "critical",
    }
}

/// One-line summary of a budget for logs and lists.
#[must_use]
pub fn format_budget_line(budget: &budget::Model, thresholds: &Thresholds) -> String {
    let utilization = aggregate::budget_utilization(budget);
    let tier = aggregate::utilization_tier(utilization, thresholds);
    format!(
        "{} ({}) | {} | {} | {}",
        budget.name,
        budget.fiscal_year,
        format_progress_bar(utilization, None),
        format_remaining(aggregate::remaining(
            budget.allocated_amount,
            budget.spent_amount
        )),
        tier_label(tier)
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::budget::BudgetStatus;
    use crate::test_utils::*;

    #[test]
    fn test_format_utilization() {
        assert_eq!(format_utilization(Some(95.0)), "95.0%");
        assert_eq!(format_utilization(Some(0.0)), "0.0%");
        assert_eq!(format_utilization(None), "N/A");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(25_000.0), "$25000.00 remaining");
        assert_eq!(format_remaining(0.0), "$0.00 remaining");
        assert_eq!(format_remaining(-150.5), "Over budget by $150.50");
    }

    #[test]
    fn test_format_adjustment_signs() {
        assert_eq!(
            format_adjustment(aggregate::discount_adjustment(1000.0, 700.0)),
            "-$300.00"
        );
        assert_eq!(
            format_adjustment(aggregate::discount_adjustment(1000.0, 1200.0)),
            "+$200.00"
        );
        assert_eq!(format_adjustment(0.0), "$0.00");
    }

    #[test]
    fn test_format_progress_bar_half() {
        assert_eq!(format_progress_bar(Some(50.0), Some(10)), "[█████░░░░░] 50.0%");
    }

    #[test]
    fn test_format_progress_bar_overspent_is_clamped() {
        assert_eq!(format_progress_bar(Some(150.0), Some(10)), "[██████████] 150.0%");
    }

    #[test]
    fn test_format_progress_bar_undefined() {
        assert_eq!(format_progress_bar(None, Some(4)), "[░░░░] N/A");
    }

    #[test]
    fn test_format_budget_line() {
        let budget = budget_model(1, "Science Lab", 500_000.0, 475_000.0);
        let line = format_budget_line(&budget, &Thresholds::default());
        assert!(line.starts_with("Science Lab (2026)"));
        assert!(line.contains("95.0%"));
        assert!(line.ends_with("critical"));

        let empty = budget_model(2, "Unfunded", 0.0, 0.0);
        let line = format_budget_line(&empty, &Thresholds::default());
        assert!(line.contains("N/A"));
        assert!(line.ends_with("no allocation"));
    }

    #[tokio::test]
    async fn test_generate_budget_report_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let budget = create_custom_budget(&db, "Field Trips", 1000.0).await?;
        let api = ExpenseApi::new(db.clone());
        for amount in [300.0, 500.0, 400.0] {
            let logged = create_test_expense(&db, budget.id, amount).await?;
            api.review(logged.id, crate::entities::expense::ApprovalStatus::Approved)
                .await?;
        }

        let report = generate_budget_report(&db, budget.id, Some(2), &Thresholds::default()).await?;

        assert_eq!(report.budget.spent_amount, 1200.0);
        assert_eq!(report.effective_status, BudgetStatus::Exceeded);
        assert_eq!(report.remaining, -200.0);
        assert_eq!(report.tier, UtilizationTier::Critical);
        assert_eq!(report.recent_expenses.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_budget_report_missing_budget() -> Result<()> {
        let db = setup_test_db().await?;
        let result = generate_budget_report(&db, 404, None, &Thresholds::default()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }
}
