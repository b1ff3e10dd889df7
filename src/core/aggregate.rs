//! Aggregator - pure derivations over store snapshots.
//!
//! Nothing in this module touches a store, a data source or a clock: every
//! function maps its inputs to a derived value, so the same snapshot always
//! produces the same rollup. Statuses such as "exceeded" and "overdue" are
//! computed here at read time and never written back.

use crate::{
    config::settings::Thresholds,
    entities::{
        budget::{self, BudgetStatus},
        class, fee_component, fee_override,
        invoice::{self, InvoiceStatus},
        timetable_slot,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// `spent / allocated * 100`, or `None` when nothing was allocated.
#[must_use]
pub fn utilization_percentage(spent: f64, allocated: f64) -> Option<f64> {
    (allocated > 0.0).then(|| (spent / allocated) * 100.0)
}

/// `allocated - spent`; negative means over budget.
#[must_use]
pub fn remaining(allocated: f64, spent: f64) -> f64 {
    allocated - spent
}

/// `original - override`; positive is a discount, negative a surcharge.
#[must_use]
pub fn discount_adjustment(original: f64, override_amount: f64) -> f64 {
    original - override_amount
}

/// Visual tier for a utilization percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationTier {
    /// Utilization is undefined (nothing allocated)
    Undefined,
    /// Below the warning threshold
    Normal,
    /// At or above warning, below critical
    Warning,
    /// At or above critical
    Critical,
}

/// Classifies `utilization` against the threshold table.
#[must_use]
pub fn utilization_tier(utilization: Option<f64>, thresholds: &Thresholds) -> UtilizationTier {
    match utilization {
        None => UtilizationTier::Undefined,
        Some(pct) if pct >= thresholds.critical => UtilizationTier::Critical,
        Some(pct) if pct >= thresholds.warning => UtilizationTier::Warning,
        Some(_) => UtilizationTier::Normal,
    }
}

/// Utilization of a single budget.
#[must_use]
pub fn budget_utilization(budget: &budget::Model) -> Option<f64> {
    utilization_percentage(budget.spent_amount, budget.allocated_amount)
}

/// Status to display: an active budget spending past its allocation shows as
/// `Exceeded`; every other budget shows its stored status.
#[must_use]
pub fn effective_budget_status(budget: &budget::Model) -> BudgetStatus {
    if budget.status == BudgetStatus::Active && budget.spent_amount > budget.allocated_amount {
        BudgetStatus::Exceeded
    } else {
        budget.status
    }
}

/// Totals across a set of budgets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetSummary {
    /// Number of budgets
    pub count: usize,
    /// Sum of allocations
    pub total_allocated: f64,
    /// Sum of spending
    pub total_spent: f64,
    /// `total_allocated - total_spent`
    pub remaining: f64,
    /// Overall utilization, `None` when nothing is allocated
    pub utilization: Option<f64>,
    /// Budgets whose effective status is `Exceeded`
    pub exceeded_count: usize,
}

/// Folds budgets into a [`BudgetSummary`].
#[must_use]
pub fn budget_summary(budgets: &[budget::Model]) -> BudgetSummary {
    let total_allocated: f64 = budgets.iter().map(|b| b.allocated_amount).sum();
    let total_spent: f64 = budgets.iter().map(|b| b.spent_amount).sum();
    BudgetSummary {
        count: budgets.len(),
        total_allocated,
        total_spent,
        remaining: remaining(total_allocated, total_spent),
        utilization: utilization_percentage(total_spent, total_allocated),
        exceeded_count: budgets
            .iter()
            .filter(|b| effective_budget_status(b) == BudgetStatus::Exceeded)
            .count(),
    }
}

/// Class KPI rollup; always derived from the full class collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassKpi {
    /// Number of classes
    pub total_classes: usize,
    /// Classes with `is_active`
    pub active_classes: usize,
    /// Classes with a class teacher assigned
    pub classes_with_teacher: usize,
    /// Sum of enrolled students
    pub total_students: i64,
}

/// Folds classes into a [`ClassKpi`].
#[must_use]
pub fn kpi_rollup(classes: &[class::Model]) -> ClassKpi {
    classes.iter().fold(ClassKpi::default(), |mut kpi, c| {
        kpi.total_classes += 1;
        kpi.active_classes += usize::from(c.is_active);
        kpi.classes_with_teacher += usize::from(c.class_teacher_id.is_some());
        kpi.total_students += c.total_students;
        kpi
    })
}

/// Status to display for an invoice on `today`.
///
/// An open invoice (pending, due or partially paid) with a positive balance and
/// a due date before `today` shows as `Overdue`.
#[must_use]
pub fn effective_invoice_status(invoice: &invoice::Model, today: NaiveDate) -> InvoiceStatus {
    let open = matches!(
        invoice.status,
        InvoiceStatus::Pending | InvoiceStatus::Due | InvoiceStatus::PartiallyPaid
    );
    if open && !invoice.is_settled() && invoice.due_date < today {
        InvoiceStatus::Overdue
    } else {
        invoice.status
    }
}

/// Totals across a set of invoices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvoiceSummary {
    /// Number of invoices, cancelled ones excluded
    pub count: usize,
    /// Sum of `amount_due`
    pub total_due: f64,
    /// Sum of `amount_paid`
    pub total_paid: f64,
    /// Sum of positive balances
    pub outstanding: f64,
    /// Invoices whose effective status is `Overdue`
    pub overdue_count: usize,
}

/// Folds invoices into an [`InvoiceSummary`]. Cancelled invoices are ignored.
#[must_use]
pub fn invoice_summary(invoices: &[invoice::Model], today: NaiveDate) -> InvoiceSummary {
    let live: Vec<&invoice::Model> = invoices
        .iter()
        .filter(|i| i.status != InvoiceStatus::Cancelled)
        .collect();
    InvoiceSummary {
        count: live.len(),
        total_due: live.iter().map(|i| i.amount_due).sum(),
        total_paid: live.iter().map(|i| i.amount_paid).sum(),
        outstanding: live.iter().map(|i| i.balance().max(0.0)).sum(),
        overdue_count: live
            .iter()
            .filter(|i| effective_invoice_status(i, today) == InvoiceStatus::Overdue)
            .count(),
    }
}

/// What a student pays for one component given an optional override.
#[must_use]
pub fn effective_component_amount(
    component_amount: f64,
    fee_override: Option<&fee_override::Model>,
) -> f64 {
    fee_override.map_or(component_amount, fee_override::Model::effective_amount)
}

/// Total a student pays for `components` after applying their `overrides`.
///
/// Overrides are matched by component id; overrides for other components or
/// other students must be filtered out by the caller.
#[must_use]
pub fn student_fee_total(
    components: &[fee_component::Model],
    overrides: &[fee_override::Model],
) -> f64 {
    let by_component: HashMap<i64, &fee_override::Model> =
        overrides.iter().map(|o| (o.component_id, o)).collect();
    components
        .iter()
        .map(|c| effective_component_amount(c.amount, by_component.get(&c.id).copied()))
        .sum()
}

/// Totals across a set of overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverrideTotals {
    /// Sum of positive adjustments on active overrides
    pub total_discount: f64,
    /// Sum of negative adjustments on active overrides, as a positive number
    pub total_surcharge: f64,
    /// Number of inactive (opt-out) overrides
    pub opt_out_count: usize,
}

/// Folds overrides into [`OverrideTotals`].
#[must_use]
pub fn override_totals(overrides: &[fee_override::Model]) -> OverrideTotals {
    overrides
        .iter()
        .fold(OverrideTotals::default(), |mut totals, o| {
            if o.is_active {
                let adjustment = o.adjustment();
                if adjustment > 0.0 {
                    totals.total_discount += adjustment;
                } else {
                    totals.total_surcharge -= adjustment;
                }
            } else {
                totals.opt_out_count += 1;
            }
            totals
        })
}

/// One day of a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    /// Day name
    pub day: String,
    /// Slots for the day, by period ascending
    pub slots: Vec<timetable_slot::Model>,
}

/// Partitions `slots` into one bucket per entry of `days`, in `days` order.
///
/// Each bucket is stably sorted by period. Days without slots get an empty
/// bucket; slots on days not listed are dropped.
#[must_use]
pub fn group_by_day(slots: &[timetable_slot::Model], days: &[&str]) -> Vec<DayBucket> {
    days.iter()
        .map(|&day| {
            let mut day_slots: Vec<timetable_slot::Model> =
                slots.iter().filter(|s| s.day == day).cloned().collect();
            day_slots.sort_by_key(|s| s.period);
            DayBucket {
                day: day.to_string(),
                slots: day_slots,
            }
        })
        .collect()
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Requested page, 1-based
    pub page: usize,
    /// Requested page size
    pub page_size: usize,
    /// Items across all pages
    pub total_items: usize,
    /// `ceil(total_items / page_size)`
    pub total_pages: usize,
}

/// Number of pages needed for `len` items.
///
/// # Errors
/// Returns [`Error::InvalidPage`] when `page_size` is 0.
pub fn total_pages(len: usize, page_size: usize) -> Result<usize> {
    if page_size == 0 {
        return Err(Error::InvalidPage { page: 0, page_size });
    }
    Ok(len.div_ceil(page_size))
}

/// Returns `items[(page - 1) * page_size .. page * page_size]`, clamped to the
/// list. A page past the end is empty.
///
/// # Errors
/// Returns [`Error::InvalidPage`] when `page` or `page_size` is 0.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Result<Page<T>> {
    if page == 0 || page_size == 0 {
        return Err(Error::InvalidPage { page, page_size });
    }
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());
    Ok(Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total_items: items.len(),
        total_pages: total_pages(items.len(), page_size)?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{budget_model, class_model, slot_model};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(id: i64, due: f64, paid: f64, status: InvoiceStatus, due_date: NaiveDate) -> invoice::Model {
        invoice::Model {
            id,
            student_id: 100 + id,
            amount_due: due,
            amount_paid: paid,
            status,
            due_date,
        }
    }

    fn fee_override(component_id: i64, original: f64, amount: f64, is_active: bool) -> fee_override::Model {
        fee_override::Model {
            id: component_id,
            student_id: 1,
            component_id,
            original_amount: original,
            override_amount: amount,
            is_active,
            reason: "scholarship".to_string(),
        }
    }

    fn component(id: i64, amount: f64) -> fee_component::Model {
        fee_component::Model {
            id,
            template_id: 1,
            name: format!("component {id}"),
            amount,
        }
    }

    #[test]
    fn test_utilization_percentage() {
        assert_eq!(utilization_percentage(475_000.0, 500_000.0), Some(95.0));
        assert_eq!(utilization_percentage(0.0, 100.0), Some(0.0));
        assert_eq!(utilization_percentage(150.0, 100.0), Some(150.0));
    }

    #[test]
    fn test_utilization_zero_allocation_is_undefined_not_zero() {
        assert_eq!(utilization_percentage(0.0, 0.0), None);
        assert_eq!(utilization_percentage(50.0, 0.0), None);
    }

    #[test]
    fn test_remaining_can_go_negative() {
        assert_eq!(remaining(100.0, 40.0), 60.0);
        assert_eq!(remaining(100.0, 125.0), -25.0);
    }

    #[test]
    fn test_discount_adjustment_sign() {
        assert_eq!(discount_adjustment(1000.0, 700.0), 300.0);
        assert_eq!(discount_adjustment(1000.0, 1200.0), -200.0);
    }

    #[test]
    fn test_critical_tier_at_95_percent() {
        let budget = budget_model(1, "Science Lab", 500_000.0, 475_000.0);
        let utilization = budget_utilization(&budget);
        assert_eq!(utilization, Some(95.0));
        assert_eq!(
            utilization_tier(utilization, &Thresholds::default()),
            UtilizationTier::Critical
        );
    }

    #[test]
    fn test_tier_boundaries() {
        let t = Thresholds::default();
        assert_eq!(utilization_tier(Some(74.99), &t), UtilizationTier::Normal);
        assert_eq!(utilization_tier(Some(75.0), &t), UtilizationTier::Warning);
        assert_eq!(utilization_tier(Some(89.99), &t), UtilizationTier::Warning);
        assert_eq!(utilization_tier(Some(90.0), &t), UtilizationTier::Critical);
        assert_eq!(utilization_tier(None, &t), UtilizationTier::Undefined);
    }

    #[test]
    fn test_effective_budget_status() {
        let over = budget_model(1, "Trips", 100.0, 120.0);
        assert_eq!(effective_budget_status(&over), BudgetStatus::Exceeded);

        let mut closed = over.clone();
        closed.status = BudgetStatus::Closed;
        assert_eq!(effective_budget_status(&closed), BudgetStatus::Closed);

        let within = budget_model(2, "Books", 100.0, 100.0);
        assert_eq!(effective_budget_status(&within), BudgetStatus::Active);
    }

    #[test]
    fn test_budget_summary() {
        let budgets = vec![
            budget_model(1, "Lab", 1000.0, 500.0),
            budget_model(2, "Trips", 200.0, 300.0),
        ];
        let summary = budget_summary(&budgets);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_allocated, 1200.0);
        assert_eq!(summary.total_spent, 800.0);
        assert_eq!(summary.remaining, 400.0);
        assert_eq!(summary.exceeded_count, 1);
        assert!((summary.utilization.unwrap() - 66.666_666).abs() < 1e-3);

        let empty = budget_summary(&[]);
        assert_eq!(empty.utilization, None);
        assert_eq!(empty.count, 0);
    }

    #[test]
    fn test_kpi_rollup() {
        let mut inactive = class_model(3, "Grade 6 - A", 25, None);
        inactive.is_active = false;
        let classes = vec![
            class_model(1, "Grade 5 - A", 30, Some(11)),
            class_model(2, "Grade 5 - B", 28, None),
            inactive,
        ];
        assert_eq!(
            kpi_rollup(&classes),
            ClassKpi {
                total_classes: 3,
                active_classes: 2,
                classes_with_teacher: 1,
                total_students: 83,
            }
        );
        assert_eq!(kpi_rollup(&[]), ClassKpi::default());
    }

    #[test]
    fn test_effective_invoice_status() {
        let today = date(2026, 10, 18);
        let late = invoice(1, 500.0, 100.0, InvoiceStatus::PartiallyPaid, date(2026, 10, 1));
        assert_eq!(effective_invoice_status(&late, today), InvoiceStatus::Overdue);

        let on_time = invoice(2, 500.0, 0.0, InvoiceStatus::Pending, today);
        assert_eq!(effective_invoice_status(&on_time, today), InvoiceStatus::Pending);

        let settled = invoice(3, 500.0, 500.0, InvoiceStatus::Paid, date(2026, 1, 1));
        assert_eq!(effective_invoice_status(&settled, today), InvoiceStatus::Paid);

        let draft = invoice(4, 500.0, 0.0, InvoiceStatus::Draft, date(2026, 1, 1));
        assert_eq!(effective_invoice_status(&draft, today), InvoiceStatus::Draft);
    }

    #[test]
    fn test_invoice_summary_ignores_cancelled() {
        let today = date(2026, 10, 18);
        let invoices = vec![
            invoice(1, 500.0, 100.0, InvoiceStatus::PartiallyPaid, date(2026, 10, 1)),
            invoice(2, 300.0, 300.0, InvoiceStatus::Paid, date(2026, 9, 1)),
            invoice(3, 900.0, 0.0, InvoiceStatus::Cancelled, date(2026, 9, 1)),
            invoice(4, 200.0, 0.0, InvoiceStatus::Due, date(2026, 11, 1)),
        ];
        let summary = invoice_summary(&invoices, today);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total_due, 1000.0);
        assert_eq!(summary.total_paid, 400.0);
        assert_eq!(summary.outstanding, 600.0);
        assert_eq!(summary.overdue_count, 1);
    }

    #[test]
    fn test_student_fee_total_with_overrides() {
        let components = vec![component(1, 1000.0), component(2, 300.0), component(3, 150.0)];
        let overrides = vec![
            fee_override(1, 1000.0, 700.0, true),
            // Opted out of transport even though an amount is stored.
            fee_override(2, 300.0, 250.0, false),
        ];
        assert_eq!(student_fee_total(&components, &overrides), 850.0);
        assert_eq!(student_fee_total(&components, &[]), 1450.0);
    }

    #[test]
    fn test_override_totals() {
        let overrides = vec![
            fee_override(1, 1000.0, 700.0, true),
            fee_override(2, 1000.0, 1200.0, true),
            fee_override(3, 300.0, 0.0, false),
        ];
        let totals = override_totals(&overrides);
        assert_eq!(totals.total_discount, 300.0);
        assert_eq!(totals.total_surcharge, 200.0);
        assert_eq!(totals.opt_out_count, 1);
    }

    #[test]
    fn test_group_by_day() {
        let slots = vec![
            slot_model(1, "Monday", 3, "Maths"),
            slot_model(2, "Tuesday", 1, "Art"),
            slot_model(3, "Monday", 1, "English"),
            slot_model(4, "Saturday", 1, "Sport"),
            slot_model(5, "Monday", 2, "Science"),
        ];
        let buckets = group_by_day(&slots, &["Monday", "Tuesday", "Wednesday"]);
        assert_eq!(buckets.len(), 3);

        let monday: Vec<&str> = buckets[0].slots.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(monday, vec!["English", "Science", "Maths"]);
        assert_eq!(buckets[1].slots.len(), 1);
        assert_eq!(buckets[2].day, "Wednesday");
        assert!(buckets[2].slots.is_empty());
        assert!(buckets.iter().all(|b| b.slots.iter().all(|s| s.day != "Saturday")));
    }

    #[test]
    fn test_group_by_day_is_stable_for_equal_periods() {
        let slots = vec![
            slot_model(1, "Monday", 1, "First"),
            slot_model(2, "Monday", 1, "Second"),
        ];
        let buckets = group_by_day(&slots, &["Monday"]);
        assert_eq!(buckets[0].slots[0].subject, "First");
        assert_eq!(buckets[0].slots[1].subject, "Second");
    }

    #[test]
    fn test_paginate_first_page() {
        let items: Vec<u32> = (0..25).collect();
        let page = paginate(&items, 1, 10).unwrap();
        assert_eq!(page.items, (0..10).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 25);
    }

    #[test]
    fn test_paginate_last_and_past_end() {
        let items: Vec<u32> = (0..25).collect();
        assert_eq!(paginate(&items, 3, 10).unwrap().items, vec![20, 21, 22, 23, 24]);
        let past = paginate(&items, 4, 10).unwrap();
        assert!(past.items.is_empty());
        assert_eq!(past.total_pages, 3);
    }

    #[test]
    fn test_paginate_rejects_zero_page_and_size() {
        let items = vec![1, 2, 3];
        assert!(matches!(
            paginate(&items, 0, 10),
            Err(Error::InvalidPage { page: 0, .. })
        ));
        assert!(matches!(
            paginate(&items, 1, 0),
            Err(Error::InvalidPage { page_size: 0, .. })
        ));
    }

    #[test]
    fn test_paginate_empty_list() {
        let items: Vec<u32> = Vec::new();
        let page = paginate(&items, 1, 10).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
