//! Seeds budgets listed in `config.toml`.

use crate::{
    api::BudgetApi,
    config::settings::BudgetSeed,
    core::source::DataSource,
    entities::budget::{self, BudgetStatus, NewBudget},
    errors::Result,
};
use tracing::{debug, info, instrument};

/// Creates every seeded budget that does not exist yet for its fiscal year.
///
/// Existing budgets are left untouched. Returns the budgets that were created.
#[instrument(skip_all, fields(seeds = seeds.len()))]
pub async fn seed_budgets(api: &BudgetApi, seeds: &[BudgetSeed]) -> Result<Vec<budget::Model>> {
    let mut created = Vec::new();
    for seed in seeds {
        if api
            .find_by_name_and_year(&seed.name, seed.fiscal_year)
            .await?
            .is_some()
        {
            debug!(name = %seed.name, year = seed.fiscal_year, "budget already exists; skipping");
            continue;
        }
        let budget = api
            .create(NewBudget {
                name: seed.name.clone(),
                category: seed.category.clone(),
                allocated_amount: seed.allocated_amount,
                status: Some(BudgetStatus::Active),
                fiscal_year: seed.fiscal_year,
                department: seed.department.clone(),
            })
            .await?;
        created.push(budget);
    }
    info!(created = created.len(), "budget seeding finished");
    Ok(created)
}
