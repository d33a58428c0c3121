use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

use rigquote_cli::commands::order::OrderArgs;
use rigquote_cli::commands::{config, migrate, order, quote, seed};
use rigquote_core::config::LoadOptions;
use rigquote_core::pricing::LineRequest;

const CATALOG: &str = r#"
[[suppliers]]
key = "ACME"
name = "Acme"
legal_name = "Acme Components SA de CV"

[[promotions]]
id = "volume"
promotion = { base = { kind = "no_discount" }, layers = [
    { kind = "tiered_quantity", tiers = [{ min_quantity = 5, percent = 10 }] },
] }

[[components]]
id = "cpu-r7"
description = "Ryzen 7"
cost = "220"
base_price = "300"
promotion_ref = "volume"

[[components]]
id = "fan-120"
description = "120mm fan"
cost = "4"
base_price = "10.50"
promotion = { base = { kind = "buy_n_pay_m", take = 3, pay = 2 } }

[[components]]
id = "pc-gamer"
description = "Gaming PC"
parts = ["cpu-r7", "fan-120"]
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("catalog.toml"), CATALOG).expect("write catalog");
        Self { dir }
    }

    fn database_url(&self) -> String {
        format!("sqlite://{}", self.dir.path().join("rigquote.db").display())
    }

    fn catalog(&self) -> PathBuf {
        self.dir.path().join("catalog.toml")
    }
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().expect("decimal string").parse().expect("decimal value")
}

fn seeded(workspace: &Workspace) {
    let result = seed::run(LoadOptions::default(), Some(workspace.catalog()));
    assert_eq!(result.exit_code, 0, "seed failed: {}", result.output);
}

fn saved_quote(lines: Vec<LineRequest>) -> i64 {
    let result = quote::run(LoadOptions::default(), lines, Vec::new());
    assert_eq!(result.exit_code, 0, "quote failed: {}", result.output);
    parse_payload(&result.output)["payload"]["folio"].as_i64().expect("folio")
}

fn order_args(folio: i64, supplier: &str) -> OrderArgs {
    OrderArgs {
        folio,
        supplier: supplier.to_string(),
        number: None,
        fulfillment: None,
        issue_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        delivery_date: None,
    }
}

#[test]
fn migrate_returns_success_with_valid_env() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_unknown_tax_code() {
    with_env(&[("RIGQUOTE_PRICING_TAX_JURISDICTIONS", "MX,XX")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_reports_env_and_default_sources() {
    with_env(&[("RIGQUOTE_ORDERING_DELIVERY_LEAD_DAYS", "3")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let entries = payload["payload"].as_array().expect("entries");
        let entry = |key: &str| {
            entries.iter().find(|entry| entry["key"] == key).cloned().expect("entry present")
        };

        let lead = entry("ordering.delivery_lead_days");
        assert_eq!(lead["value"], "3");
        assert_eq!(lead["source"], "env (RIGQUOTE_ORDERING_DELIVERY_LEAD_DAYS)");

        let taxes = entry("pricing.tax_jurisdictions");
        assert_eq!(taxes["value"], "MX");
        assert_eq!(taxes["source"], "default");
    });
}

#[test]
fn seed_loads_catalog_and_is_idempotent() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        for _ in 0..2 {
            let result = seed::run(LoadOptions::default(), Some(workspace.catalog()));
            assert_eq!(result.exit_code, 0, "seed failed: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["payload"]["components"], 3);
            assert_eq!(payload["payload"]["promotions"], 1);
            assert_eq!(payload["payload"]["suppliers"], 1);
        }
    });
}

#[test]
fn seed_uses_catalog_path_from_config() {
    let workspace = Workspace::new();
    let catalog = workspace.catalog().display().to_string();
    with_env(
        &[
            ("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str()),
            ("RIGQUOTE_CATALOG_PATH", catalog.as_str()),
        ],
        || {
            let result = seed::run(LoadOptions::default(), None);
            assert_eq!(result.exit_code, 0, "seed failed: {}", result.output);
        },
    );
}

#[test]
fn seed_without_catalog_is_a_config_failure() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        let result = seed::run(LoadOptions::default(), None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_unreadable_catalog_as_input_failure() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        let missing = workspace.dir.path().join("missing.toml");
        let result = seed::run(LoadOptions::default(), Some(missing));
        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "catalog_file");
    });
}

#[test]
fn quote_prices_saves_and_reports_rejected_lines() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);

        let result = quote::run(
            LoadOptions::default(),
            vec![
                LineRequest::new("cpu-r7", 2),
                LineRequest::new("fan-120", 3),
                LineRequest::new("ghost", 1),
            ],
            Vec::new(),
        );
        assert_eq!(result.exit_code, 0, "quote failed: {}", result.output);

        let payload = parse_payload(&result.output);
        let body = &payload["payload"];
        assert!(body["folio"].as_i64().expect("folio") > 0);
        assert_eq!(body["quote"]["lines"].as_array().expect("lines").len(), 2);
        // 2 * 300 + 3 fans paying for 2 at 10.50
        assert_eq!(decimal(&body["quote"]["subtotal"]), Decimal::from(621));
        assert_eq!(decimal(&body["quote"]["total"]), Decimal::new(72_036, 2));
        assert_eq!(body["rejected"][0]["error_class"], "component_not_found");
        let steps = body["trace"]["steps"].as_array().expect("steps");
        assert_eq!(steps.last().expect("total step")["stage"], "total");
    });
}

#[test]
fn quote_with_unknown_tax_code_fails_whole_request() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);

        let result = quote::run(
            LoadOptions::default(),
            vec![LineRequest::new("cpu-r7", 1)],
            vec!["XX".to_string()],
        );
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "unsupported_tax_jurisdiction");
    });
}

#[test]
fn quote_with_only_rejected_lines_is_empty() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);

        let result =
            quote::run(LoadOptions::default(), vec![LineRequest::new("cpu-r7", 0)], Vec::new());
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "empty_quote");
    });
}

#[test]
fn order_is_generated_from_saved_quote() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);
        let folio = saved_quote(vec![
            LineRequest::new("cpu-r7", 2),
            LineRequest::new("fan-120", 3),
            LineRequest::new("cpu-r7", 1),
        ]);

        let result = order::run(LoadOptions::default(), order_args(folio, "ACME"));
        assert_eq!(result.exit_code, 0, "order failed: {}", result.output);

        let payload = parse_payload(&result.output);
        let order = &payload["payload"];
        assert!(order["number"].as_i64().expect("number") > 0);
        assert_eq!(order["supplier"]["key"], "ACME");
        assert_eq!(order["fulfillment_level"], 100);
        assert_eq!(order["issue_date"], "2024-05-01");
        assert_eq!(order["delivery_date"], "2024-05-08");

        let lines = order["lines"].as_array().expect("lines");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["article_id"], "cpu-r7");
        assert_eq!(lines[0]["quantity"], 3);
        assert_eq!(decimal(&lines[0]["line_total"]), Decimal::from(900));
    });
}

#[test]
fn order_for_unknown_supplier_fails() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);
        let folio = saved_quote(vec![LineRequest::new("cpu-r7", 1)]);

        let result = order::run(LoadOptions::default(), order_args(folio, "NOPE"));
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "supplier_not_found");
    });
}

#[test]
fn order_for_unknown_folio_fails() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);

        let result = order::run(LoadOptions::default(), order_args(404, "ACME"));
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "quote_not_found");
    });
}

#[test]
fn order_rejects_out_of_range_fulfillment_level() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);
        let folio = saved_quote(vec![LineRequest::new("cpu-r7", 1)]);

        let mut args = order_args(folio, "ACME");
        args.fulfillment = Some(150);
        let result = order::run(LoadOptions::default(), args);
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_fulfillment_level");
    });
}

#[test]
fn order_rejects_non_positive_order_number() {
    let workspace = Workspace::new();
    with_env(&[("RIGQUOTE_DATABASE_URL", workspace.database_url().as_str())], || {
        seeded(&workspace);
        let folio = saved_quote(vec![LineRequest::new("cpu-r7", 1)]);

        for number in [-5, 0] {
            let mut args = order_args(folio, "ACME");
            args.number = Some(number);
            let result = order::run(LoadOptions::default(), args);
            assert_eq!(result.exit_code, 7);
            assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
        }
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "RIGQUOTE_DATABASE_URL",
        "RIGQUOTE_DATABASE_MAX_CONNECTIONS",
        "RIGQUOTE_DATABASE_TIMEOUT_SECS",
        "RIGQUOTE_PRICING_TAX_JURISDICTIONS",
        "RIGQUOTE_ORDERING_DELIVERY_LEAD_DAYS",
        "RIGQUOTE_ORDERING_DEFAULT_FULFILLMENT_LEVEL",
        "RIGQUOTE_CATALOG_PATH",
        "RIGQUOTE_LOGGING_LEVEL",
        "RIGQUOTE_LOGGING_FORMAT",
        "RIGQUOTE_LOG_LEVEL",
        "RIGQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
