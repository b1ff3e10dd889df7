use campus_ledger::{
    api::BudgetApi,
    config::{database, seed, settings},
    core::{
        aggregate, coordinator::MutationCoordinator, report, store::CollectionStore,
    },
    entities::{BudgetModel, budget::BudgetFilter},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load settings
    let settings = settings::load_settings_or_default("config.toml")
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!(
        warning = settings.thresholds.warning,
        critical = settings.thresholds.critical,
        "Settings loaded."
    );

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed budgets from config.toml
    let api = BudgetApi::new(db);
    seed::seed_budgets(&api, &settings.budgets)
        .await
        .inspect_err(|e| error!("Failed to seed budgets: {}", e))?;

    // 6. Load budgets through the coordinator and report on them
    let coordinator = MutationCoordinator::new(api);
    let store = CollectionStore::<BudgetModel>::new().into_shared();
    coordinator.load(&store, &BudgetFilter::default()).await?;

    let budgets = store.read().await.snapshot();
    let summary = aggregate::budget_summary(&budgets);
    info!(
        budgets = summary.count,
        allocated = summary.total_allocated,
        spent = summary.total_spent,
        utilization = %report::format_utilization(summary.utilization),
        "Budget summary"
    );
    let first_page = settings.pagination.page(&budgets, 1)?;
    info!(
        shown = first_page.items.len(),
        pages = first_page.total_pages,
        "Listing first page of budgets"
    );
    for budget in &first_page.items {
        let line = report::format_budget_line(budget, &settings.thresholds);
        match aggregate::utilization_tier(aggregate::budget_utilization(budget), &settings.thresholds)
        {
            aggregate::UtilizationTier::Critical | aggregate::UtilizationTier::Warning => {
                warn!("{line}");
            }
            _ => info!("{line}"),
        }
    }

    Ok(())
}
