use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::db::schema::Model;
use crate::search::filters::{FilterKind, FilterOptions};

/// Searchable fields of one model and the filter each one uses.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub fields: BTreeMap<String, FilterKind>,
}

/// `[filters]` block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct FilterSettings {
    #[serde(default)]
    pub published_status_enabled: bool,
}

/// Top-level shopsearch config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ShopSearchConfig {
    pub orders: Option<ModelConfig>,
    pub products: Option<ModelConfig>,
    #[serde(default)]
    pub filters: FilterSettings,
}

impl ShopSearchConfig {
    /// Load config from an explicit path. Returns default if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(ShopSearchConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: ShopSearchConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config: {}", path.display());
        Ok(config)
    }

    /// Searchable fields for a model, falling back to the built-in defaults
    /// when the model has no section of its own.
    pub fn model_fields(&self, model: Model) -> BTreeMap<String, FilterKind> {
        let section = match model {
            Model::Orders => self.orders.as_ref(),
            Model::Products => self.products.as_ref(),
        };
        section
            .map(|s| s.fields.clone())
            .unwrap_or_else(|| default_fields(model))
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            published_status_enabled: self.filters.published_status_enabled,
        }
    }

    /// Effective configuration as TOML, defaults filled in.
    pub fn display(&self) -> Result<String> {
        let effective = ShopSearchConfig {
            orders: Some(ModelConfig {
                fields: self.model_fields(Model::Orders),
            }),
            products: Some(ModelConfig {
                fields: self.model_fields(Model::Products),
            }),
            filters: self.filters.clone(),
        };
        Ok(toml::to_string_pretty(&effective)?)
    }
}

/// Built-in searchable fields per model.
pub fn default_fields(model: Model) -> BTreeMap<String, FilterKind> {
    let pairs: &[(&str, FilterKind)] = match model {
        Model::Orders => &[
            ("Status", FilterKind::OptionSet),
            ("HasPayment", FilterKind::Payment),
        ],
        Model::Products => &[
            ("Category", FilterKind::Category),
            ("Status", FilterKind::PublishedStatus),
        ],
    };
    pairs
        .iter()
        .map(|(name, kind)| (name.to_string(), *kind))
        .collect()
}

/// Path to the config file: ~/.shopsearch/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".shopsearch").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.shopsearch/config.toml
# Filter kinds: option_set, payment, category, published_status

[orders.fields]
Status = "option_set"
HasPayment = "payment"
# Email = "option_set"

[products.fields]
Category = "category"
Status = "published_status"

[filters]
# Compare products.status when filtering on published status.
# Off by default: the published-status filter leaves the query unchanged.
published_status_enabled = false
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, default_config_template())?;
    Ok(true)
}
