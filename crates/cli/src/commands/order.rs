use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};

use rigquote_core::config::LoadOptions;
use rigquote_core::domain::order::OrderNumber;
use rigquote_core::domain::quote::Folio;
use rigquote_core::domain::supplier::SupplierKey;
use rigquote_core::ordering::{Budget, OrderManager, OrderRequest, QuoteBudget};
use rigquote_db::{
    CatalogRepository, OrderRepository, QuoteRepository, SqlCatalogRepository, SqlOrderRepository,
    SqlQuoteRepository,
};

use crate::commands::{
    build_runtime, domain_failure, load_config, open_pool, repository_failure, CommandResult,
    Failure, EXIT_CONFIG, EXIT_DOMAIN, EXIT_INPUT,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderArgs {
    pub folio: i64,
    pub supplier: String,
    pub number: Option<i64>,
    pub fulfillment: Option<i64>,
    pub issue_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
}

/// Generates a supplier order from a saved quote and stores it.
///
/// Without explicit dates the order is issued today and delivered after the
/// configured lead time. An explicit order number must be positive.
pub fn run(options: LoadOptions, args: OrderArgs) -> CommandResult {
    let config = match load_config("order", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    if let Some(number) = args.number.filter(|number| *number <= 0) {
        return CommandResult::failure(
            "order",
            "invalid_input",
            format!("order number must be positive, got {number}"),
            EXIT_INPUT,
        );
    }

    let issue_date = args.issue_date.unwrap_or_else(|| Utc::now().date_naive());
    let delivery_date = match args.delivery_date {
        Some(date) => date,
        None => {
            let lead = Days::new(u64::from(config.ordering.delivery_lead_days));
            match issue_date.checked_add_days(lead) {
                Some(date) => date,
                None => {
                    return CommandResult::failure(
                        "order",
                        "config_validation",
                        "delivery date is out of range for the configured lead time",
                        EXIT_CONFIG,
                    )
                }
            }
        }
    };
    let request = OrderRequest {
        supplier_key: SupplierKey::new(args.supplier),
        order_number: args.number.map(OrderNumber).unwrap_or(OrderNumber::UNASSIGNED),
        fulfillment_level: args.fulfillment.unwrap_or(config.ordering.default_fulfillment_level),
        issue_date,
        delivery_date,
    };
    let folio = Folio(args.folio);

    let runtime = match build_runtime("order") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        let quote = SqlQuoteRepository::new(pool.clone())
            .find_by_folio(folio)
            .await
            .map_err(repository_failure)?
            .ok_or_else(|| ("quote_not_found", format!("quote {folio} was not found"), EXIT_DOMAIN))?;
        let budget = QuoteBudget::try_from(Some(quote)).map_err(domain_failure)?;

        let catalog = SqlCatalogRepository::new(pool.clone())
            .load_snapshot()
            .await
            .map_err(repository_failure)?;
        let mut manager = OrderManager::new(catalog);
        let budget: Arc<dyn Budget> = Arc::new(budget);
        manager.load_budget(Some(budget)).map_err(domain_failure)?;
        let order = manager.generate_order(&request).map_err(domain_failure)?;

        let order = SqlOrderRepository::new(pool.clone())
            .save(order)
            .await
            .map_err(repository_failure)?;

        pool.close().await;
        Ok::<_, Failure>(order)
    });

    match result {
        Ok(order) => {
            tracing::info!(
                event_name = "cli.order.completed",
                folio = folio.0,
                order_number = order.number().0,
                supplier_key = %order.supplier().key,
                total = %order.total(),
                "order saved"
            );
            let message = format!(
                "order {} saved for supplier {}: {} lines, total {}",
                order.number(),
                order.supplier().key,
                order.lines().len(),
                order.total()
            );
            CommandResult::success_with("order", message, order)
        }
        Err(failure) => CommandResult::from_failure("order", failure),
    }
}
