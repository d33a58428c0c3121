use serde::Serialize;

use rigquote_core::config::LoadOptions;
use rigquote_core::domain::quote::{Folio, Quote};
use rigquote_core::pricing::{LineRequest, PricingTrace, QuotePricer, QuoteRequest, RejectedLine};
use rigquote_db::{CatalogRepository, QuoteRepository, SqlCatalogRepository, SqlQuoteRepository};

use crate::commands::{
    build_runtime, domain_failure, load_config, open_pool, repository_failure, CommandResult,
    Failure, EXIT_INPUT,
};

#[derive(Debug, Serialize)]
struct QuoteOutput {
    folio: Option<Folio>,
    quote: Quote,
    rejected: Vec<RejectedLine>,
    trace: PricingTrace,
}

/// Parses `component[:quantity[:promotion]]`. Quantity defaults to one.
pub fn parse_line_spec(raw: &str) -> Result<LineRequest, String> {
    let mut parts = raw.split(':').map(str::trim);
    let component = parts.next().filter(|part| !part.is_empty()).ok_or_else(|| {
        format!("line `{raw}` has no component id; expected component[:quantity[:promotion]]")
    })?;
    let quantity = match parts.next() {
        Some(quantity) => quantity
            .parse::<i64>()
            .map_err(|_| format!("line `{raw}` has a non-numeric quantity `{quantity}`"))?,
        None => 1,
    };
    let promotion = parts.next().filter(|part| !part.is_empty());
    if parts.next().is_some() {
        return Err(format!("line `{raw}` has too many `:` separated fields"));
    }

    let line = LineRequest::new(component, quantity);
    Ok(match promotion {
        Some(promotion) => line.with_promotion(promotion),
        None => line,
    })
}

/// Prices the requested lines against the stored catalog and saves the quote.
///
/// Lines naming an unknown component or promotion, or a non-positive
/// quantity, are reported under `rejected` and left out of the quote.
pub fn run(options: LoadOptions, lines: Vec<LineRequest>, taxes: Vec<String>) -> CommandResult {
    let config = match load_config("quote", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    if lines.is_empty() {
        return CommandResult::failure(
            "quote",
            "invalid_input",
            "at least one --line is required",
            EXIT_INPUT,
        );
    }
    let tax_codes = if taxes.is_empty() { config.pricing.tax_jurisdictions.clone() } else { taxes };

    let runtime = match build_runtime("quote") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let catalog = SqlCatalogRepository::new(pool.clone())
            .load_snapshot()
            .await
            .map_err(repository_failure)?;

        let request = QuoteRequest { lines, tax_codes };
        let priced = QuotePricer::default().price(&catalog, &request).map_err(domain_failure)?;

        let quote = SqlQuoteRepository::new(pool.clone())
            .save(priced.quote)
            .await
            .map_err(repository_failure)?;

        pool.close().await;
        Ok::<_, Failure>(QuoteOutput {
            folio: quote.folio(),
            quote,
            rejected: priced.rejected,
            trace: priced.trace,
        })
    });

    match result {
        Ok(output) => {
            let folio = output.folio.map(|folio| folio.0).unwrap_or_default();
            tracing::info!(
                event_name = "cli.quote.completed",
                folio,
                lines = output.quote.lines().len(),
                rejected = output.rejected.len(),
                total = %output.quote.total(),
                "quote saved"
            );
            let message = format!(
                "quote {folio} saved: {} lines, total {}",
                output.quote.lines().len(),
                output.quote.total()
            );
            CommandResult::success_with("quote", message, output)
        }
        Err(failure) => CommandResult::from_failure("quote", failure),
    }
}
