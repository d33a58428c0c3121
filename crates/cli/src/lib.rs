pub mod catalog_file;
pub mod commands;
pub mod logging;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use rigquote_core::config::{ConfigOverrides, LoadOptions, LogFormat};
use rigquote_core::pricing::LineRequest;

use commands::order::OrderArgs;
use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "rigquote",
    about = "Rigquote operator CLI",
    long_about = "Price PC component quotes with promotions and taxes, and turn saved quotes into supplier orders.",
    after_help = "Examples:\n  rigquote seed --catalog config/catalog.example.toml\n  rigquote quote --line cpu-r7:2 --line fan-120:3\n  rigquote order --folio 1 --supplier ACME"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load; it must exist when given")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[arg(long, global = true, value_parser = parse_log_format, help = "Override logging.format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load suppliers, promotions and components from a TOML catalog file")]
    Seed {
        #[arg(long, help = "Catalog file; defaults to catalog.path from config")]
        catalog: Option<PathBuf>,
    },
    #[command(about = "Price a quote against the stored catalog and save it")]
    Quote {
        #[arg(
            long = "line",
            required = true,
            value_parser = commands::quote::parse_line_spec,
            help = "Quote line as component[:quantity[:promotion]]; repeatable"
        )]
        lines: Vec<LineRequest>,
        #[arg(long = "tax", help = "Tax jurisdiction code; repeatable, defaults to pricing.tax_jurisdictions")]
        taxes: Vec<String>,
    },
    #[command(about = "Generate and save a supplier order from a saved quote")]
    Order {
        #[arg(long, help = "Folio of the saved quote")]
        folio: i64,
        #[arg(long, help = "Supplier key")]
        supplier: String,
        #[arg(long, help = "Explicit order number; assigned on save when omitted")]
        number: Option<i64>,
        #[arg(long, help = "Fulfillment level 0..=100; defaults to ordering.default_fulfillment_level")]
        fulfillment: Option<i64>,
        #[arg(long, help = "Issue date (YYYY-MM-DD); defaults to today")]
        issue_date: Option<NaiveDate>,
        #[arg(long, help = "Delivery date (YYYY-MM-DD); defaults to issue date plus ordering.delivery_lead_days")]
        delivery_date: Option<NaiveDate>,
    },
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    raw.parse::<LogFormat>().map_err(|error| error.to_string())
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn execute(cli: Cli) -> CommandResult {
    let options = cli.load_options();
    match cli.command {
        Command::Config => commands::config::run(options),
        Command::Migrate => commands::migrate::run(options),
        Command::Seed { catalog } => commands::seed::run(options, catalog),
        Command::Quote { lines, taxes } => commands::quote::run(options, lines, taxes),
        Command::Order {
            folio,
            supplier,
            number,
            fulfillment,
            issue_date,
            delivery_date,
        } => commands::order::run(
            options,
            OrderArgs { folio, supplier, number, fulfillment, issue_date, delivery_date },
        ),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn quote_subcommand_parses_repeated_lines_and_taxes() {
        let cli = Cli::try_parse_from([
            "rigquote",
            "quote",
            "--line",
            "cpu-r7:2",
            "--line",
            "fan-120:7:bulk",
            "--tax",
            "CA",
        ])
        .expect("parse");

        let Command::Quote { lines, taxes } = cli.command else {
            panic!("expected quote command");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].promotion_id.as_deref(), Some("bulk"));
        assert_eq!(taxes, vec!["CA".to_string()]);
    }

    #[test]
    fn quote_subcommand_requires_a_line() {
        assert!(Cli::try_parse_from(["rigquote", "quote"]).is_err());
        assert!(Cli::try_parse_from(["rigquote", "quote", "--line", "ssd:lots"]).is_err());
    }

    #[test]
    fn global_config_flag_makes_the_file_required() {
        let cli = Cli::try_parse_from(["rigquote", "migrate", "--config", "ops/rigquote.toml"])
            .expect("parse");
        let options = cli.load_options();
        assert!(options.require_file);
        assert_eq!(
            options.config_path.as_deref(),
            Some(std::path::Path::new("ops/rigquote.toml"))
        );
    }

    #[test]
    fn order_subcommand_parses_dates() {
        let cli = Cli::try_parse_from([
            "rigquote",
            "order",
            "--folio",
            "3",
            "--supplier",
            "ACME",
            "--issue-date",
            "2024-05-01",
        ])
        .expect("parse");

        let Command::Order { folio, issue_date, delivery_date, .. } = cli.command else {
            panic!("expected order command");
        };
        assert_eq!(folio, 3);
        assert_eq!(issue_date, chrono::NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(delivery_date, None);
    }
}
