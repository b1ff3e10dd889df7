//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations,
//! plus the draft, patch and filter types the data sources accept.

pub mod budget;
pub mod class;
pub mod expense;
pub mod fee_component;
pub mod fee_override;
pub mod fee_template;
pub mod invoice;
pub mod template_mapping;
pub mod timetable_slot;

// Re-export specific types to avoid conflicts
pub use budget::{Column as BudgetColumn, Entity as Budget, Model as BudgetModel};
pub use class::{Column as ClassColumn, Entity as Class, Model as ClassModel};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use fee_component::{
    Column as FeeComponentColumn, Entity as FeeComponent, Model as FeeComponentModel,
};
pub use fee_override::{
    Column as FeeOverrideColumn, Entity as FeeOverride, Model as FeeOverrideModel,
};
pub use fee_template::{
    Column as FeeTemplateColumn, Entity as FeeTemplate, Model as FeeTemplateModel,
};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel};
pub use template_mapping::{
    Column as TemplateMappingColumn, Entity as TemplateMapping, Model as TemplateMappingModel,
};
pub use timetable_slot::{
    Column as TimetableSlotColumn, Entity as TimetableSlot, Model as TimetableSlotModel,
};
