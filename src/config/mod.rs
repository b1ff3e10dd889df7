/// Database connection and table creation
pub mod database;

/// Budget seeding from config.toml
pub mod seed;

/// Thresholds, pagination and seed lists from config.toml
pub mod settings;
