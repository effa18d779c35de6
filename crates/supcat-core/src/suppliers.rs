use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ConfigError;

fn default_products_path() -> String {
    "/products".to_string()
}

/// Where a registered supplier's data is pulled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Api {
        base_url: String,
        #[serde(default = "default_products_path")]
        products_path: String,
        /// Name of the env var holding the bearer token.
        api_key_env: Option<String>,
    },
    Csv {
        url: String,
    },
    Sitemap {
        sitemap_url: String,
    },
}

impl SourceConfig {
    fn urls(&self) -> Vec<&str> {
        match self {
            SourceConfig::Api { base_url, .. } => vec![base_url.as_str()],
            SourceConfig::Csv { url } => vec![url.as_str()],
            SourceConfig::Sitemap { sitemap_url } => vec![sitemap_url.as_str()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub id: Uuid,
    pub name: String,
    /// Six-field cron expression; suppliers without one only run on demand.
    pub schedule: Option<String>,
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize)]
pub struct SuppliersFile {
    pub suppliers: Vec<SupplierConfig>,
}

impl SuppliersFile {
    /// Find a supplier by UUID or by case-insensitive name.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&SupplierConfig> {
        let key = key.trim();
        if let Ok(id) = Uuid::parse_str(key) {
            return self.suppliers.iter().find(|s| s.id == id);
        }
        self.suppliers
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(key))
    }
}

/// Load and validate the supplier registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_suppliers(path: &Path) -> Result<SuppliersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SuppliersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let suppliers_file: SuppliersFile = serde_yaml::from_str(&content)?;

    validate_suppliers(&suppliers_file)?;

    Ok(suppliers_file)
}

fn validate_suppliers(suppliers_file: &SuppliersFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut seen_names = HashSet::new();

    for supplier in &suppliers_file.suppliers {
        if supplier.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "supplier name must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(supplier.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier id: {}",
                supplier.id
            )));
        }

        if !seen_names.insert(supplier.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier name: '{}'",
                supplier.name
            )));
        }

        for url in supplier.source.urls() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "supplier '{}' has non-http url '{url}'",
                    supplier.name
                )));
            }
        }

        if let SourceConfig::Api {
            api_key_env: Some(var),
            ..
        } = &supplier.source
        {
            if var.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "supplier '{}' has an empty api_key_env",
                    supplier.name
                )));
            }
        }

        if let Some(schedule) = &supplier.schedule {
            if schedule.split_whitespace().count() < 6 {
                return Err(ConfigError::Validation(format!(
                    "supplier '{}' schedule '{schedule}' must have six cron fields",
                    supplier.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "suppliers_test.rs"]
mod tests;
