//! Invoice API - student invoices and payments against them.

use crate::{
    core::{source::DataSource, store::Record},
    entities::{
        Invoice,
        invoice::{self, InvoiceFilter, InvoicePatch, InvoiceStatus, NewInvoice, validate_payment},
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Database-backed invoice source.
#[derive(Debug, Clone)]
pub struct InvoiceApi {
    db: DatabaseConnection,
}

impl InvoiceApi {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a payment of `amount` against an invoice.
    ///
    /// The status becomes `Paid` once nothing is outstanding, otherwise
    /// `PartiallyPaid`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAmount`] for a non-positive amount,
    /// [`Error::Validation`] when the invoice is not open or the amount exceeds
    /// the balance, and [`Error::NotFound`] for a missing invoice.
    #[instrument(skip(self))]
    pub async fn record_payment(&self, invoice_id: i64, amount: f64) -> Result<invoice::Model> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(Error::InvalidAmount { amount });
        }

        let txn = self.db.begin().await?;
        let current = Invoice::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("invoice", invoice_id))?;
        validate_payment(&current, amount)?;

        let mut paid = current.clone();
        paid.amount_paid += amount;
        let status = if paid.is_settled() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };

        let mut active: invoice::ActiveModel = current.into();
        active.amount_paid = Set(paid.amount_paid);
        active.status = Set(status);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(balance = updated.balance(), ?status, "payment recorded");
        Ok(updated)
    }
}

#[async_trait]
impl DataSource<invoice::Model> for InvoiceApi {
    async fn get_all(&self, filter: &InvoiceFilter) -> Result<Vec<invoice::Model>> {
        let mut query = Invoice::find();
        if let Some(student_id) = filter.student_id {
            query = query.filter(invoice::Column::StudentId.eq(student_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(invoice::Column::Status.eq(status));
        }
        if let Some(from) = filter.due_from {
            query = query.filter(invoice::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.due_to {
            query = query.filter(invoice::Column::DueDate.lte(to));
        }
        query
            .order_by_asc(invoice::Column::DueDate)
            .order_by_asc(invoice::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<invoice::Model>> {
        Invoice::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn create(&self, draft: NewInvoice) -> Result<invoice::Model> {
        invoice::Model::validate_draft(&draft)?;
        let model = invoice::ActiveModel {
            student_id: Set(draft.student_id),
            amount_due: Set(draft.amount_due),
            amount_paid: Set(0.0),
            status: Set(draft.status.unwrap_or(InvoiceStatus::Pending)),
            due_date: Set(draft.due_date),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &i64, patch: InvoicePatch) -> Result<Option<invoice::Model>> {
        invoice::Model::validate_patch(&patch)?;
        super::update_by_id::<Invoice, _>(&self.db, *id, &patch).await
    }

    async fn delete(&self, id: &i64) -> Result<()> {
        Invoice::delete_by_id(*id).exec(&self.db).await?;
        Ok(())
    }
}
