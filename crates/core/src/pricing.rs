use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::ComponentCatalog;
use crate::domain::component::ComponentId;
use crate::domain::quote::{ComponentRef, Quote};
use crate::domain::tax::{TaxCatalog, TaxStrategy};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub component_id: ComponentId,
    pub quantity: i64,
    /// Named catalog promotion used instead of the component's own.
    #[serde(default)]
    pub promotion_id: Option<String>,
}

impl LineRequest {
    pub fn new(component_id: impl Into<String>, quantity: i64) -> Self {
        Self { component_id: ComponentId::new(component_id), quantity, promotion_id: None }
    }

    pub fn with_promotion(mut self, promotion_id: impl Into<String>) -> Self {
        self.promotion_id = Some(promotion_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub lines: Vec<LineRequest>,
    pub tax_codes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub steps: Vec<PricingTraceStep>,
}

impl PricingTrace {
    fn push(&mut self, stage: impl Into<String>, detail: impl Into<String>, amount: Decimal) {
        self.steps.push(PricingTraceStep { stage: stage.into(), detail: detail.into(), amount });
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    pub request: LineRequest,
    pub reason: String,
    pub error_class: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedQuote {
    pub quote: Quote,
    pub rejected: Vec<RejectedLine>,
    pub trace: PricingTrace,
}

/// Builds and totals quotes from catalog data.
///
/// Tax codes are resolved before any line is priced. A line that cannot be
/// priced is reported in [`PricedQuote::rejected`] without affecting the
/// others; a request where every line is rejected fails with `EmptyQuote`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuotePricer {
    taxes: TaxCatalog,
}

impl QuotePricer {
    pub fn new(taxes: TaxCatalog) -> Self {
        Self { taxes }
    }

    pub fn price<C>(&self, catalog: &C, request: &QuoteRequest) -> Result<PricedQuote, DomainError>
    where
        C: ComponentCatalog + ?Sized,
    {
        self.price_at(catalog, request, Utc::now())
    }

    pub fn price_at<C>(
        &self,
        catalog: &C,
        request: &QuoteRequest,
        created_at: DateTime<Utc>,
    ) -> Result<PricedQuote, DomainError>
    where
        C: ComponentCatalog + ?Sized,
    {
        let taxes = self.taxes.resolve_all(&request.tax_codes)?;

        let mut quote = Quote::new(created_at);
        let mut trace = PricingTrace::default();
        let mut rejected = Vec::new();

        for line_request in &request.lines {
            if let Err(error) = price_line(catalog, &mut quote, &mut trace, line_request) {
                debug!(
                    event_name = "pricing.line.rejected",
                    component_id = %line_request.component_id,
                    error_class = error.class(),
                    "quote line rejected"
                );
                rejected.push(RejectedLine {
                    request: line_request.clone(),
                    reason: error.to_string(),
                    error_class: error.class().to_string(),
                });
            }
        }

        let strategies: Vec<&dyn TaxStrategy> =
            taxes.iter().map(|tax| tax as &dyn TaxStrategy).collect();
        quote.compute_totals(&strategies)?;

        trace.push("subtotal", "sum(line amounts)", quote.subtotal());
        for applied in quote.applied_taxes() {
            trace.push(
                format!("tax:{}", applied.code),
                format!("subtotal * {}", applied.rate),
                applied.amount,
            );
        }
        trace.push("total", "subtotal + tax", quote.total());

        info!(
            event_name = "pricing.quote.priced",
            lines = quote.lines().len(),
            rejected = rejected.len(),
            subtotal = %quote.subtotal(),
            tax_amount = %quote.tax_amount(),
            total = %quote.total(),
            "quote priced"
        );

        Ok(PricedQuote { quote, rejected, trace })
    }
}

fn price_line<C>(
    catalog: &C,
    quote: &mut Quote,
    trace: &mut PricingTrace,
    request: &LineRequest,
) -> Result<(), DomainError>
where
    C: ComponentCatalog + ?Sized,
{
    let component = catalog
        .find_component(&request.component_id)
        .ok_or_else(|| DomainError::ComponentNotFound(request.component_id.0.clone()))?;

    let promotion = match &request.promotion_id {
        Some(id) => Some(
            catalog.find_promotion(id).ok_or_else(|| DomainError::PromotionNotFound(id.clone()))?,
        ),
        None => component.promotion.as_ref(),
    };

    let list_price = component.list_price()?;
    let reference = ComponentRef::from(component);
    let line = match promotion {
        Some(promotion) => {
            quote.add_promoted_line(reference, request.quantity, list_price, promotion)?
        }
        None => quote.add_line(reference, request.quantity, list_price)?,
    };

    let rule = promotion.map(|promotion| promotion.describe()).unwrap_or_else(|| "list".to_string());
    trace.push(
        format!("line:{}", line.line_number),
        format!("{} x{} @ {} ({rule})", line.component.id, line.quantity, line.unit_price),
        line.amount,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{LineRequest, QuotePricer, QuoteRequest};
    use crate::catalog::{InMemoryCatalog, NamedPromotion};
    use crate::domain::component::Component;
    use crate::domain::promotion::Promotion;
    use crate::errors::DomainError;

    fn catalog() -> InMemoryCatalog {
        let fan = Component::part("fan-120", "120mm fan", Decimal::from(4), Decimal::from(10))
            .expect("valid part")
            .with_promotion(Promotion::buy_n_pay_m(3, 2).expect("valid"));
        let cpu = Component::part("cpu-r7", "Ryzen 7", Decimal::from(220), Decimal::from(300))
            .expect("valid part");
        let mut pc = Component::pc("pc-office", "Office PC")
            .with_promotion(Promotion::no_discount().with_flat_percent(Decimal::from(10)).expect("valid"));
        pc.add_sub_component(cpu.clone()).expect("add");
        pc.add_sub_component(fan.clone()).expect("add");

        InMemoryCatalog::new(
            vec![fan, cpu, pc],
            vec![NamedPromotion {
                id: "bulk".to_string(),
                promotion: Promotion::no_discount()
                    .with_tiers([(5, Decimal::from(10)), (10, Decimal::from(20))])
                    .expect("valid"),
            }],
            Vec::new(),
        )
        .expect("valid catalog")
    }

    #[test]
    fn prices_lines_through_component_promotions_and_taxes() {
        let request = QuoteRequest {
            lines: vec![LineRequest::new("fan-120", 7), LineRequest::new("cpu-r7", 1)],
            tax_codes: vec!["MX".to_string()],
        };

        let priced = QuotePricer::default().price(&catalog(), &request).expect("priced");

        assert_eq!(priced.quote.lines()[0].amount, Decimal::from(50));
        assert_eq!(priced.quote.subtotal(), Decimal::from(350));
        assert_eq!(priced.quote.tax_amount(), Decimal::from(56));
        assert_eq!(priced.quote.total(), Decimal::from(406));
        assert!(priced.rejected.is_empty());
        assert_eq!(priced.trace.steps.last().map(|step| step.stage.as_str()), Some("total"));
    }

    #[test]
    fn composite_lines_use_summed_parts_then_pc_promotion() {
        let request =
            QuoteRequest { lines: vec![LineRequest::new("pc-office", 2)], tax_codes: Vec::new() };

        let priced = QuotePricer::default().price(&catalog(), &request).expect("priced");

        // (300 + 10) per PC, 10% off
        assert_eq!(priced.quote.lines()[0].unit_price, Decimal::from(310));
        assert_eq!(priced.quote.lines()[0].amount, Decimal::from(558));
    }

    #[test]
    fn named_promotion_overrides_component_promotion() {
        let request = QuoteRequest {
            lines: vec![LineRequest::new("cpu-r7", 12).with_promotion("bulk")],
            tax_codes: Vec::new(),
        };

        let priced = QuotePricer::default().price(&catalog(), &request).expect("priced");

        assert_eq!(priced.quote.lines()[0].amount, Decimal::from(2_880));
    }

    #[test]
    fn bad_lines_are_reported_without_dropping_good_ones() {
        let request = QuoteRequest {
            lines: vec![
                LineRequest::new("cpu-r7", 1),
                LineRequest::new("gpu-missing", 1),
                LineRequest::new("fan-120", 0),
                LineRequest::new("cpu-r7", 1).with_promotion("nope"),
            ],
            tax_codes: Vec::new(),
        };

        let priced = QuotePricer::default().price(&catalog(), &request).expect("priced");

        assert_eq!(priced.quote.lines().len(), 1);
        let classes: Vec<&str> =
            priced.rejected.iter().map(|line| line.error_class.as_str()).collect();
        assert_eq!(classes, vec!["component_not_found", "invalid_line", "promotion_not_found"]);
    }

    #[test]
    fn overflowing_line_is_rejected_and_siblings_are_priced() {
        let price = Decimal::from(10_000_000_000i64);
        let rack =
            Component::part("rack", "Server rack", Decimal::ZERO, price).expect("valid part");
        let cpu = Component::part("cpu-r7", "Ryzen 7", Decimal::from(220), Decimal::from(300))
            .expect("valid part");
        let catalog =
            InMemoryCatalog::new(vec![rack, cpu], Vec::new(), Vec::new()).expect("catalog");
        let request = QuoteRequest {
            lines: vec![LineRequest::new("rack", i64::MAX), LineRequest::new("cpu-r7", 1)],
            tax_codes: vec!["MX".to_string()],
        };

        let priced = QuotePricer::default().price(&catalog, &request).expect("priced");

        assert_eq!(priced.quote.lines().len(), 1);
        assert_eq!(priced.quote.subtotal(), Decimal::from(300));
        assert_eq!(priced.rejected.len(), 1);
        assert_eq!(priced.rejected[0].error_class, "amount_overflow");
    }

    #[test]
    fn unsupported_tax_code_fails_the_whole_quote() {
        let request = QuoteRequest {
            lines: vec![LineRequest::new("cpu-r7", 1)],
            tax_codes: vec!["MX".to_string(), "ZZ".to_string()],
        };

        let error = QuotePricer::default().price(&catalog(), &request).expect_err("bad tax");
        assert_eq!(error, DomainError::UnsupportedTaxJurisdiction("ZZ".to_string()));
    }

    #[test]
    fn request_with_only_rejected_lines_is_an_empty_quote() {
        let request =
            QuoteRequest { lines: vec![LineRequest::new("ghost", 1)], tax_codes: Vec::new() };

        let error = QuotePricer::default().price(&catalog(), &request).expect_err("empty");
        assert_eq!(error, DomainError::EmptyQuote);
    }
}
