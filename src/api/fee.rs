//! Fee API - fee templates, their components, per-student overrides and the
//! template assigned to each class.
//!
//! Bulk operations upsert: assigning a template to a class that already has one
//! replaces the mapping, and overriding a component a student already has an
//! override for replaces that override. Each bulk call runs in one transaction,
//! so it either applies to every target or to none.

use crate::{
    core::{source::DataSource, store::Record},
    entities::{
        Class, FeeComponent, FeeOverride, FeeTemplate, TemplateMapping,
        fee_component::{self, FeeComponentFilter, FeeComponentPatch, NewFeeComponent},
        fee_override::{self, FeeOverrideFilter, FeeOverridePatch, NewFeeOverride, OverrideTerms},
        fee_template::{self, FeeTemplateFilter, FeeTemplatePatch, NewFeeTemplate},
        template_mapping::{self, MappingFilter, MappingPatch, NewMapping},
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Database-backed source for every fee resource.
#[derive(Debug, Clone)]
pub struct FeeApi {
    db: DatabaseConnection,
}

/// Drops repeated ids, keeping the first occurrence's position.
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl FeeApi {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Assigns `template_id` to every class in `class_ids`.
    ///
    /// Each class ends up with exactly one mapping whatever it had before; the
    /// mapping snapshots the class size and template total at assignment time.
    /// Repeated class ids are assigned once. Returns the mappings in request
    /// order.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for an empty request and
    /// [`Error::NotFound`] when the template or any class does not exist; in
    /// that case nothing is written.
    #[instrument(skip(self, class_ids), fields(classes = class_ids.len()))]
    pub async fn bulk_assign_template(
        &self,
        class_ids: &[i64],
        template_id: i64,
    ) -> Result<Vec<template_mapping::Model>> {
        if class_ids.is_empty() {
            return Err(Error::validation("Select at least one class"));
        }

        let txn = self.db.begin().await?;
        let template = FeeTemplate::find_by_id(template_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("fee template", template_id))?;

        let assigned_at = chrono::Utc::now();
        let mut mappings = Vec::with_capacity(class_ids.len());
        for class_id in dedup_ids(class_ids) {
            let class = Class::find_by_id(class_id)
                .one(&txn)
                .await?
                .ok_or_else(|| Error::not_found("class", class_id))?;

            let model = template_mapping::ActiveModel {
                class_id: Set(class_id),
                template_id: Set(template.id),
                student_count: Set(class.total_students),
                total_amount: Set(template.total_amount),
                assigned_at: Set(assigned_at),
            };
            let existing = TemplateMapping::find_by_id(class_id).one(&txn).await?;
            let saved = if existing.is_some() {
                model.update(&txn).await?
            } else {
                model.insert(&txn).await?
            };
            mappings.push(saved);
        }
        txn.commit().await?;

        info!(count = mappings.len(), template_id, "template assigned");
        Ok(mappings)
    }

    /// Mappings for one class; holds at most one element.
    pub async fn mappings_by_class(&self, class_id: i64) -> Result<Vec<template_mapping::Model>> {
        TemplateMapping::find()
            .filter(template_mapping::Column::ClassId.eq(class_id))
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Applies the same override terms to every student in `student_ids`.
    ///
    /// The original amount is taken from the component. A student who already
    /// has an override for the component gets it replaced. Returns the
    /// overrides in request order.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for an empty request or empty reason,
    /// [`Error::InvalidAmount`] for a negative amount and [`Error::NotFound`]
    /// when the component does not exist.
    #[instrument(skip(self, student_ids, terms), fields(students = student_ids.len(), component_id = terms.component_id))]
    pub async fn bulk_assign_override(
        &self,
        student_ids: &[i64],
        terms: &OverrideTerms,
    ) -> Result<Vec<fee_override::Model>> {
        let students = dedup_ids(student_ids);
        let Some(first) = students.first() else {
            return Err(Error::validation("Select at least one student"));
        };
        fee_override::Model::validate_draft(&terms.for_student(*first))?;

        let txn = self.db.begin().await?;
        let component = FeeComponent::find_by_id(terms.component_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("fee component", terms.component_id))?;

        let mut overrides = Vec::with_capacity(students.len());
        for student_id in students {
            let existing = FeeOverride::find()
                .filter(fee_override::Column::StudentId.eq(student_id))
                .filter(fee_override::Column::ComponentId.eq(component.id))
                .one(&txn)
                .await?;
            let saved = if let Some(existing) = existing {
                let mut active: fee_override::ActiveModel = existing.into();
                active.original_amount = Set(component.amount);
                active.override_amount = Set(terms.override_amount);
                active.is_active = Set(terms.is_active);
                active.reason = Set(terms.reason.trim().to_string());
                active.update(&txn).await?
            } else {
                fee_override::ActiveModel {
                    student_id: Set(student_id),
                    component_id: Set(component.id),
                    original_amount: Set(component.amount),
                    override_amount: Set(terms.override_amount),
                    is_active: Set(terms.is_active),
                    reason: Set(terms.reason.trim().to_string()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            };
            overrides.push(saved);
        }
        txn.commit().await?;

        info!(count = overrides.len(), "overrides applied");
        Ok(overrides)
    }

    /// Components of one template, in creation order.
    pub async fn components_for_template(
        &self,
        template_id: i64,
    ) -> Result<Vec<fee_component::Model>> {
        FeeComponent::find()
            .filter(fee_component::Column::TemplateId.eq(template_id))
            .order_by_asc(fee_component::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Deletes the overrides of the given components.
    async fn delete_overrides_for<C>(db: &C, component_ids: Vec<i64>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        FeeOverride::delete_many()
            .filter(fee_override::Column::ComponentId.is_in(component_ids))
            .exec(db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DataSource<fee_template::Model> for FeeApi {
    async fn get_all(&self, filter: &FeeTemplateFilter) -> Result<Vec<fee_template::Model>> {
        let mut query = FeeTemplate::find();
        if let Some(year) = &filter.academic_year {
            query = query.filter(fee_template::Column::AcademicYear.eq(year.as_str()));
        }
        query
            .order_by_asc(fee_template::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<fee_template::Model>> {
        FeeTemplate::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn create(&self, draft: NewFeeTemplate) -> Result<fee_template::Model> {
        fee_template::Model::validate_draft(&draft)?;
        fee_template::ActiveModel {
            name: Set(draft.name.trim().to_string()),
            academic_year: Set(draft.academic_year),
            total_amount: Set(draft.total_amount),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(Into::into)
    }

    async fn update(
        &self,
        id: &i64,
        patch: FeeTemplatePatch,
    ) -> Result<Option<fee_template::Model>> {
        fee_template::Model::validate_patch(&patch)?;
        super::update_by_id::<FeeTemplate, _>(&self.db, *id, &patch).await
    }

    /// Removes the template with its components, their overrides and every
    /// class mapping that points at it.
    #[instrument(skip(self))]
    async fn delete(&self, id: &i64) -> Result<()> {
        let txn = self.db.begin().await?;
        let component_ids: Vec<i64> = FeeComponent::find()
            .filter(fee_component::Column::TemplateId.eq(*id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        Self::delete_overrides_for(&txn, component_ids).await?;
        FeeComponent::delete_many()
            .filter(fee_component::Column::TemplateId.eq(*id))
            .exec(&txn)
            .await?;
        TemplateMapping::delete_many()
            .filter(template_mapping::Column::TemplateId.eq(*id))
            .exec(&txn)
            .await?;
        FeeTemplate::delete_by_id(*id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DataSource<fee_component::Model> for FeeApi {
    async fn get_all(&self, filter: &FeeComponentFilter) -> Result<Vec<fee_component::Model>> {
        match filter.template_id {
            Some(template_id) => self.components_for_template(template_id).await,
            None => FeeComponent::find()
                .order_by_asc(fee_component::Column::Id)
                .all(&self.db)
                .await
                .map_err(Into::into),
        }
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<fee_component::Model>> {
        FeeComponent::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn create(&self, draft: NewFeeComponent) -> Result<fee_component::Model> {
        fee_component::Model::validate_draft(&draft)?;
        FeeTemplate::find_by_id(draft.template_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("fee template", draft.template_id))?;
        fee_component::ActiveModel {
            template_id: Set(draft.template_id),
            name: Set(draft.name.trim().to_string()),
            amount: Set(draft.amount),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(Into::into)
    }

    async fn update(
        &self,
        id: &i64,
        patch: FeeComponentPatch,
    ) -> Result<Option<fee_component::Model>> {
        fee_component::Model::validate_patch(&patch)?;
        super::update_by_id::<FeeComponent, _>(&self.db, *id, &patch).await
    }

    async fn delete(&self, id: &i64) -> Result<()> {
        let txn = self.db.begin().await?;
        Self::delete_overrides_for(&txn, vec![*id]).await?;
        FeeComponent::delete_by_id(*id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DataSource<fee_override::Model> for FeeApi {
    async fn get_all(&self, filter: &FeeOverrideFilter) -> Result<Vec<fee_override::Model>> {
        let mut query = FeeOverride::find();
        if let Some(student_id) = filter.student_id {
            query = query.filter(fee_override::Column::StudentId.eq(student_id));
        }
        if let Some(component_id) = filter.component_id {
            query = query.filter(fee_override::Column::ComponentId.eq(component_id));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(fee_override::Column::IsActive.eq(active));
        }
        query
            .order_by_asc(fee_override::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, id: &i64) -> Result<Option<fee_override::Model>> {
        FeeOverride::find_by_id(*id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn create(&self, draft: NewFeeOverride) -> Result<fee_override::Model> {
        let terms = OverrideTerms {
            component_id: draft.component_id,
            override_amount: draft.override_amount,
            is_active: draft.is_active,
            reason: draft.reason,
        };
        self.bulk_assign_override(&[draft.student_id], &terms)
            .await?
            .pop()
            .ok_or_else(|| Error::not_found("fee override", draft.student_id))
    }

    async fn update(
        &self,
        id: &i64,
        patch: FeeOverridePatch,
    ) -> Result<Option<fee_override::Model>> {
        fee_override::Model::validate_patch(&patch)?;
        super::update_by_id::<FeeOverride, _>(&self.db, *id, &patch).await
    }

    async fn delete(&self, id: &i64) -> Result<()> {
        FeeOverride::delete_by_id(*id).exec(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSource<template_mapping::Model> for FeeApi {
    async fn get_all(&self, filter: &MappingFilter) -> Result<Vec<template_mapping::Model>> {
        let mut query = TemplateMapping::find();
        if let Some(template_id) = filter.template_id {
            query = query.filter(template_mapping::Column::TemplateId.eq(template_id));
        }
        query
            .order_by_asc(template_mapping::Column::ClassId)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_by_id(&self, class_id: &i64) -> Result<Option<template_mapping::Model>> {
        TemplateMapping::find_by_id(*class_id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn create(&self, draft: NewMapping) -> Result<template_mapping::Model> {
        self.bulk_assign_template(&[draft.class_id], draft.template_id)
            .await?
            .pop()
            .ok_or_else(|| Error::not_found("class", draft.class_id))
    }

    /// Re-assigns the class to another template, refreshing the snapshots.
    async fn update(
        &self,
        class_id: &i64,
        patch: MappingPatch,
    ) -> Result<Option<template_mapping::Model>> {
        let Some(current) = TemplateMapping::find_by_id(*class_id).one(&self.db).await? else {
            return Ok(None);
        };
        let template_id = patch.template_id.unwrap_or(current.template_id);
        Ok(self
            .bulk_assign_template(&[*class_id], template_id)
            .await?
            .pop())
    }

    async fn delete(&self, class_id: &i64) -> Result<()> {
        TemplateMapping::delete_by_id(*class_id)
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
