//! Dashboard settings loaded from config.toml
//!
//! Holds the utilization threshold table, the default page size and the list
//! of budgets to seed on first run. Every section is optional; missing values
//! fall back to the defaults (warning 75%, critical 90%, 10 rows per page).

use crate::{
    core::aggregate::{self, Page},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Utilization alert thresholds
    pub thresholds: Thresholds,
    /// List pagination
    pub pagination: Pagination,
    /// Budgets to seed when missing
    pub budgets: Vec<BudgetSeed>,
}

/// Utilization percentages at which a budget is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Warning tier starts here
    pub warning: f64,
    /// Critical tier starts here
    pub critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 75.0,
            critical: 90.0,
        }
    }
}

/// Pagination defaults for list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// Rows per page
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl Pagination {
    /// Slices `items` into the 1-based `page` at the configured size.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPage`] for page 0.
    pub fn page<T: Clone>(&self, items: &[T], page: usize) -> Result<Page<T>> {
        aggregate::paginate(items, page, self.page_size)
    }
}

/// A budget to create on startup if it does not exist yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BudgetSeed {
    /// Display name
    pub name: String,
    /// Spending category
    pub category: String,
    /// Amount allocated
    pub allocated_amount: f64,
    /// Fiscal year
    pub fiscal_year: i32,
    /// Owning department
    pub department: String,
}

impl Settings {
    /// Checks that the loaded values are usable.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when thresholds are out of order or not
    /// positive, or when the page size is zero.
    pub fn validate(&self) -> Result<()> {
        let Thresholds { warning, critical } = self.thresholds;
        if !(warning > 0.0 && critical > 0.0) {
            return Err(Error::Config {
                message: format!("Thresholds must be positive (warning {warning}, critical {critical})"),
            });
        }
        if warning >= critical {
            return Err(Error::Config {
                message: format!(
                    "Warning threshold {warning} must be below critical threshold {critical}"
                ),
            });
        }
        if self.pagination.page_size == 0 {
            return Err(Error::Config {
                message: "Page size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses and validates settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The values fail [`Settings::validate`]
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    debug!("Attempting to load settings from: {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `path`, or returns the defaults when the file does not exist.
pub fn load_settings_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if path.exists() {
        load_settings(path)
    } else {
        info!("No settings file at {}; using defaults", path.display());
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_full_settings() {
        let toml_str = r#"
            [thresholds]
            warning = 70.0
            critical = 95.0

            [pagination]
            page_size = 25

            [[budgets]]
            name = "Science Lab"
            category = "equipment"
            allocated_amount = 500000.0
            fiscal_year = 2026
            department = "science"
        "#;

        let settings = parse_settings(toml_str).unwrap();
        assert_eq!(settings.thresholds.warning, 70.0);
        assert_eq!(settings.thresholds.critical, 95.0);
        assert_eq!(settings.pagination.page_size, 25);
        assert_eq!(settings.budgets.len(), 1);
        assert_eq!(settings.budgets[0].name, "Science Lab");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.thresholds, Thresholds::default());
        assert_eq!(settings.thresholds.warning, 75.0);
        assert_eq!(settings.thresholds.critical, 90.0);
        assert_eq!(settings.pagination.page_size, 10);
        assert!(settings.budgets.is_empty());

        let partial = parse_settings("[thresholds]\nwarning = 60.0\n").unwrap();
        assert_eq!(partial.thresholds.warning, 60.0);
        assert_eq!(partial.thresholds.critical, 90.0);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let result = parse_settings("[thresholds]\nwarning = 95.0\ncritical = 90.0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let result = parse_settings("[pagination]\npage_size = 0\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_pages_use_configured_size() {
        let settings = parse_settings("[pagination]\npage_size = 2\n").unwrap();
        let rows = [1, 2, 3, 4, 5];

        let last = settings.pagination.page(&rows, 3).unwrap();
        assert_eq!(last.items, vec![5]);
        assert_eq!(last.page_size, 2);
        assert_eq!(last.total_pages, 3);

        assert!(matches!(
            settings.pagination.page(&rows, 0),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let result = parse_settings("thresholds = [");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = load_settings_or_default("definitely/not/here/config.toml").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
