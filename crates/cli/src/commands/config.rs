use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::Value;

use rigquote_core::config::LoadOptions;

use crate::commands::{load_config, CommandResult};

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

/// Reports the effective configuration and where each value came from.
/// Precedence is env over file over default.
pub fn run(options: LoadOptions) -> CommandResult {
    let explicit_path = options.config_path.clone();
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = vec![
        ConfigEntry {
            key: "database.url",
            value: config.database.url.clone(),
            source: source("database.url", &["RIGQUOTE_DATABASE_URL"]),
        },
        ConfigEntry {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            source: source("database.max_connections", &["RIGQUOTE_DATABASE_MAX_CONNECTIONS"]),
        },
        ConfigEntry {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            source: source("database.timeout_secs", &["RIGQUOTE_DATABASE_TIMEOUT_SECS"]),
        },
        ConfigEntry {
            key: "pricing.tax_jurisdictions",
            value: config.pricing.tax_jurisdictions.join(","),
            source: source("pricing.tax_jurisdictions", &["RIGQUOTE_PRICING_TAX_JURISDICTIONS"]),
        },
        ConfigEntry {
            key: "ordering.delivery_lead_days",
            value: config.ordering.delivery_lead_days.to_string(),
            source: source(
                "ordering.delivery_lead_days",
                &["RIGQUOTE_ORDERING_DELIVERY_LEAD_DAYS"],
            ),
        },
        ConfigEntry {
            key: "ordering.default_fulfillment_level",
            value: config.ordering.default_fulfillment_level.to_string(),
            source: source(
                "ordering.default_fulfillment_level",
                &["RIGQUOTE_ORDERING_DEFAULT_FULFILLMENT_LEVEL"],
            ),
        },
        ConfigEntry {
            key: "catalog.path",
            value: config
                .catalog
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            source: source("catalog.path", &["RIGQUOTE_CATALOG_PATH"]),
        },
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source("logging.level", &["RIGQUOTE_LOGGING_LEVEL", "RIGQUOTE_LOG_LEVEL"]),
        },
        ConfigEntry {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            source: source("logging.format", &["RIGQUOTE_LOGGING_FORMAT", "RIGQUOTE_LOG_FORMAT"]),
        },
    ];

    CommandResult::success_with(
        "config",
        "effective config (source precedence: env > file > default)",
        entries,
    )
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from("rigquote.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/rigquote.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
