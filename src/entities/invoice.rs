//! Invoice entity - Fees billed to a student.
//!
//! The outstanding balance is never stored: [`Model::balance`] always derives it
//! from `amount_due - amount_paid`.

use crate::{
    core::{source::Materialize, store::Record},
    errors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier for the invoice
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student being billed
    pub student_id: i64,
    /// Total billed
    pub amount_due: f64,
    /// Total received so far
    pub amount_paid: f64,
    /// Stored status
    pub status: InvoiceStatus,
    /// Payment deadline
    pub due_date: Date,
}

impl Model {
    /// Outstanding amount; negative when overpaid.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.amount_due - self.amount_paid
    }

    /// Outstanding amount in whole cents, for exact comparisons.
    #[must_use]
    pub fn balance_cents(&self) -> i64 {
        to_cents(self.amount_due) - to_cents(self.amount_paid)
    }

    /// Whether nothing is left to pay.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.balance_cents() <= 0
    }
}

/// Rounds a currency amount to whole cents.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Invoice lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Not yet sent
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Sent, not yet due
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment expected now
    #[sea_orm(string_value = "due")]
    Due,
    /// Some payment received
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    /// Settled
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Past due date with a balance
    #[sea_orm(string_value = "overdue")]
    Overdue,
    /// Voided
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl InvoiceStatus {
    /// Whether the invoice can still receive payments.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Due | Self::PartiallyPaid | Self::Overdue
        )
    }
}

/// No relationships are navigated from invoices
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Payload for issuing an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Student being billed
    pub student_id: i64,
    /// Total billed
    pub amount_due: f64,
    /// Payment deadline
    pub due_date: Date,
    /// Initial status; defaults to `Pending`
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

/// Partial update of an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePatch {
    /// New total billed
    pub amount_due: Option<f64>,
    /// New total received
    pub amount_paid: Option<f64>,
    /// New status
    pub status: Option<InvoiceStatus>,
    /// New deadline
    pub due_date: Option<Date>,
}

/// Query filter for invoices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceFilter {
    /// Student being billed
    pub student_id: Option<i64>,
    /// Stored status
    pub status: Option<InvoiceStatus>,
    /// Earliest due date (inclusive)
    pub due_from: Option<Date>,
    /// Latest due date (inclusive)
    pub due_to: Option<Date>,
}

/// Checks a payment against an invoice before it is sent to the server.
///
/// # Errors
/// Returns [`errors::Error::InvalidAmount`] for a non-positive amount and
/// [`errors::Error::Validation`] when the invoice is closed or the amount exceeds the
/// outstanding balance.
pub fn validate_payment(invoice: &Model, amount: f64) -> errors::Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(errors::Error::InvalidAmount { amount });
    }
    if !invoice.status.is_open() {
        return Err(errors::Error::validation(format!(
            "Invoice {} is not open for payments",
            invoice.id
        )));
    }
    if to_cents(amount) > invoice.balance_cents() {
        return Err(errors::Error::validation(format!(
            "Payment of {amount:.2} exceeds outstanding balance of {:.2}",
            invoice.balance()
        )));
    }
    Ok(())
}

fn check_amount(amount: f64) -> errors::Result<()> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(errors::Error::InvalidAmount { amount });
    }
    Ok(())
}

impl Record for Model {
    type Id = i64;
    type Draft = NewInvoice;
    type Patch = InvoicePatch;
    type Filter = InvoiceFilter;
    const RESOURCE: &'static str = "invoice";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply_patch(&mut self, patch: &InvoicePatch) {
        if let Some(due) = patch.amount_due {
            self.amount_due = due;
        }
        if let Some(paid) = patch.amount_paid {
            self.amount_paid = paid;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(date) = patch.due_date {
            self.due_date = date;
        }
    }

    fn matches(&self, filter: &InvoiceFilter) -> bool {
        filter.student_id.is_none_or(|s| self.student_id == s)
            && filter.status.is_none_or(|s| self.status == s)
            && filter.due_from.is_none_or(|d| self.due_date >= d)
            && filter.due_to.is_none_or(|d| self.due_date <= d)
    }

    fn validate_draft(draft: &NewInvoice) -> errors::Result<()> {
        check_amount(draft.amount_due)?;
        if draft.status == Some(InvoiceStatus::Paid) && to_cents(draft.amount_due) > 0 {
            return Err(errors::Error::validation(
                "A new invoice with an amount due cannot start as paid",
            ));
        }
        Ok(())
    }

    fn validate_patch(patch: &InvoicePatch) -> errors::Result<()> {
        if let Some(due) = patch.amount_due {
            check_amount(due)?;
        }
        patch.amount_paid.map_or(Ok(()), check_amount)
    }

    fn validate_state(&self) -> errors::Result<()> {
        if self.status == InvoiceStatus::Paid && !self.is_settled() {
            return Err(errors::Error::validation(format!(
                "Invoice {} cannot be paid with {:.2} outstanding",
                self.id,
                self.balance()
            )));
        }
        Ok(())
    }
}

impl Materialize for Model {
    fn materialize(id: i64, draft: NewInvoice) -> Self {
        Self {
            id,
            student_id: draft.student_id,
            amount_due: draft.amount_due,
            amount_paid: 0.0,
            status: draft.status.unwrap_or(InvoiceStatus::Pending),
            due_date: draft.due_date,
        }
    }
}
