use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::component::{Component, ComponentId};
use crate::domain::money;
use crate::domain::promotion::Promotion;
use crate::domain::tax::TaxStrategy;
use crate::errors::DomainError;

/// Identifier assigned by the persistence layer when a quote is saved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Folio(pub i64);

impl std::fmt::Display for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Component identity plus the description captured at quote time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub id: ComponentId,
    pub description: String,
}

impl ComponentRef {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: ComponentId::new(id), description: description.into() }
    }
}

impl From<ComponentId> for ComponentRef {
    fn from(id: ComponentId) -> Self {
        Self { id, description: String::new() }
    }
}

impl From<&Component> for ComponentRef {
    fn from(component: &Component) -> Self {
        Self { id: component.id.clone(), description: component.description.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub line_number: u32,
    pub component: ComponentRef,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTax {
    pub code: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    folio: Option<Folio>,
    created_at: DateTime<Utc>,
    lines: Vec<QuoteLine>,
    applied_taxes: Vec<AppliedTax>,
    subtotal: Decimal,
    tax_amount: Decimal,
    total: Decimal,
}

impl Default for Quote {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Quote {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            folio: None,
            created_at,
            lines: Vec::new(),
            applied_taxes: Vec::new(),
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Rebuilds a saved quote. Line numbers must run 1..=n in order and the
    /// totals are recomputed from the lines and the stored tax breakdown.
    pub fn restore(
        folio: Folio,
        created_at: DateTime<Utc>,
        lines: Vec<QuoteLine>,
        applied_taxes: Vec<AppliedTax>,
    ) -> Result<Self, DomainError> {
        for (index, line) in lines.iter().enumerate() {
            if line.line_number as usize != index + 1 {
                return Err(DomainError::InvariantViolation(format!(
                    "quote {folio} line {} is out of sequence",
                    line.line_number
                )));
            }
            if line.quantity <= 0 {
                return Err(DomainError::InvalidLine {
                    component_id: line.component.id.0.clone(),
                    quantity: line.quantity,
                });
            }
        }

        let subtotal = money::sum(lines.iter().map(|line| line.amount), "subtotal")?;
        let tax_amount = money::sum(applied_taxes.iter().map(|tax| tax.amount), "tax amount")?;
        let total = money::add(subtotal, tax_amount, "quote total")?;
        Ok(Self { folio: Some(folio), created_at, lines, applied_taxes, subtotal, tax_amount, total })
    }

    pub fn folio(&self) -> Option<Folio> {
        self.folio
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[QuoteLine] {
        &self.lines
    }

    pub fn applied_taxes(&self) -> &[AppliedTax] {
        &self.applied_taxes
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_read_only(&self) -> bool {
        self.folio.is_some()
    }

    /// Appends a line priced at `unit_price * quantity`.
    pub fn add_line(
        &mut self,
        component: impl Into<ComponentRef>,
        quantity: i64,
        unit_price: Decimal,
    ) -> Result<&QuoteLine, DomainError> {
        let component = component.into();
        self.check_line(&component, quantity)?;
        let amount = money::mul(unit_price, Decimal::from(quantity), "line amount")?;
        Ok(self.push_line(component, quantity, unit_price, amount))
    }

    /// Appends a line whose amount runs through `promotion`.
    pub fn add_promoted_line(
        &mut self,
        component: impl Into<ComponentRef>,
        quantity: i64,
        unit_price: Decimal,
        promotion: &Promotion,
    ) -> Result<&QuoteLine, DomainError> {
        let component = component.into();
        self.check_line(&component, quantity)?;
        let amount = promotion.calculate_amount(quantity, unit_price)?;
        Ok(self.push_line(component, quantity, unit_price, amount))
    }

    /// Leaves the quote untouched when any amount overflows.
    pub fn compute_totals(&mut self, taxes: &[&dyn TaxStrategy]) -> Result<(), DomainError> {
        self.ensure_writable()?;
        if self.lines.is_empty() {
            return Err(DomainError::EmptyQuote);
        }

        let subtotal = money::sum(self.lines.iter().map(|line| line.amount), "subtotal")?;
        let applied_taxes = taxes
            .iter()
            .map(|tax| {
                Ok::<_, DomainError>(AppliedTax {
                    code: tax.code().to_string(),
                    rate: tax.rate(),
                    amount: tax.calculate(subtotal)?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let tax_amount = money::sum(applied_taxes.iter().map(|tax| tax.amount), "tax amount")?;
        let total = money::add(subtotal, tax_amount, "quote total")?;

        self.subtotal = subtotal;
        self.applied_taxes = applied_taxes;
        self.tax_amount = tax_amount;
        self.total = total;
        Ok(())
    }

    /// Records the folio handed back by the persistence layer. The quote is
    /// read-only afterwards.
    pub fn assign_folio(&mut self, folio: Folio) -> Result<(), DomainError> {
        self.ensure_writable()?;
        if self.lines.is_empty() {
            return Err(DomainError::EmptyQuote);
        }
        self.folio = Some(folio);
        Ok(())
    }

    fn check_line(&self, component: &ComponentRef, quantity: i64) -> Result<(), DomainError> {
        self.ensure_writable()?;
        if quantity <= 0 {
            return Err(DomainError::InvalidLine { component_id: component.id.0.clone(), quantity });
        }
        Ok(())
    }

    fn push_line(
        &mut self,
        component: ComponentRef,
        quantity: i64,
        unit_price: Decimal,
        amount: Decimal,
    ) -> &QuoteLine {
        let line_number = self.lines.len() as u32 + 1;
        self.lines.push(QuoteLine { line_number, component, quantity, unit_price, amount });
        &self.lines[self.lines.len() - 1]
    }

    fn ensure_writable(&self) -> Result<(), DomainError> {
        match self.folio {
            Some(folio) => Err(DomainError::QuoteReadOnly { folio: folio.0 }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{ComponentRef, Folio, Quote};
    use crate::domain::promotion::Promotion;
    use crate::domain::tax::{TaxCatalog, TaxStrategy};
    use crate::errors::DomainError;

    fn quote_with_lines() -> Quote {
        let mut quote = Quote::new(Utc::now());
        quote
            .add_line(ComponentRef::new("cpu-r7", "Ryzen 7"), 2, Decimal::from(300))
            .expect("valid line");
        quote
            .add_line(ComponentRef::new("ram-32", "32GB DDR5"), 4, Decimal::new(8950, 2))
            .expect("valid line");
        quote
    }

    #[test]
    fn lines_are_numbered_in_insertion_order() {
        let quote = quote_with_lines();
        let numbers: Vec<u32> = quote.lines().iter().map(|line| line.line_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(quote.lines()[1].amount, Decimal::from(358));
    }

    #[test]
    fn non_positive_quantity_rejects_only_that_line() {
        let mut quote = quote_with_lines();
        let error = quote
            .add_line(ComponentRef::new("gpu", "GPU"), 0, Decimal::from(500))
            .expect_err("zero quantity");
        assert_eq!(error, DomainError::InvalidLine { component_id: "gpu".to_string(), quantity: 0 });

        assert_eq!(quote.lines().len(), 2);
        let next = quote.add_line(ComponentRef::new("gpu", "GPU"), 1, Decimal::from(500));
        assert_eq!(next.expect("valid line").line_number, 3);
    }

    #[test]
    fn compute_totals_sums_every_tax_over_the_subtotal() {
        let mut quote = quote_with_lines();
        let mx = TaxCatalog.resolve("MX").expect("mx");
        let ca = TaxCatalog.resolve("CA").expect("ca");

        quote.compute_totals(&[&mx, &ca]).expect("totals");

        assert_eq!(quote.subtotal(), Decimal::from(958));
        assert_eq!(quote.tax_amount(), Decimal::new(20118, 2));
        assert_eq!(quote.total(), quote.subtotal() + quote.tax_amount());
        assert_eq!(quote.applied_taxes().len(), 2);
        assert_eq!(quote.applied_taxes()[0].amount, Decimal::new(15328, 2));
    }

    #[test]
    fn compute_totals_is_idempotent() {
        let mut quote = quote_with_lines();
        let hn = TaxCatalog.resolve("HN").expect("hn");
        let taxes: [&dyn TaxStrategy; 1] = [&hn];

        quote.compute_totals(&taxes).expect("first");
        let first = (quote.subtotal(), quote.tax_amount(), quote.total());
        quote.compute_totals(&taxes).expect("second");

        assert_eq!(first, (quote.subtotal(), quote.tax_amount(), quote.total()));
    }

    #[test]
    fn empty_quote_is_rejected_when_totaled() {
        let mut quote = Quote::new(Utc::now());
        assert_eq!(quote.compute_totals(&[]), Err(DomainError::EmptyQuote));
        assert_eq!(quote.assign_folio(Folio(1)), Err(DomainError::EmptyQuote));
    }

    #[test]
    fn overflowing_amounts_are_errors_and_leave_totals_untouched() {
        let mut quote = Quote::new(Utc::now());
        let error = quote
            .add_line(ComponentRef::new("fan", "Fan"), i64::MAX, Decimal::from(10_000_000_000i64))
            .expect_err("line amount overflows");
        assert!(matches!(error, DomainError::AmountOverflow(_)));
        assert!(quote.lines().is_empty());

        quote.add_line(ComponentRef::new("a", "A"), 1, Decimal::MAX).expect("fits");
        quote.add_line(ComponentRef::new("b", "B"), 1, Decimal::MAX).expect("fits");
        let error = quote.compute_totals(&[]).expect_err("subtotal overflows");
        assert!(matches!(error, DomainError::AmountOverflow(_)));
        assert_eq!(quote.subtotal(), Decimal::ZERO);
        assert_eq!(quote.total(), Decimal::ZERO);
    }

    #[test]
    fn quote_without_taxes_totals_to_subtotal() {
        let mut quote = quote_with_lines();
        quote.compute_totals(&[]).expect("totals");
        assert_eq!(quote.total(), Decimal::from(958));
        assert_eq!(quote.tax_amount(), Decimal::ZERO);
    }

    #[test]
    fn promoted_line_uses_the_promotion_chain() {
        let mut quote = Quote::new(Utc::now());
        let promotion = Promotion::buy_n_pay_m(3, 2).expect("valid");

        let line = quote
            .add_promoted_line(ComponentRef::new("fan", "Case fan"), 7, Decimal::from(100), &promotion)
            .expect("valid line");

        assert_eq!(line.amount, Decimal::from(500));
        assert_eq!(line.unit_price, Decimal::from(100));
    }

    #[test]
    fn persisted_quote_is_read_only() {
        let mut quote = quote_with_lines();
        quote.compute_totals(&[]).expect("totals");
        quote.assign_folio(Folio(42)).expect("folio");

        let error = quote
            .add_line(ComponentRef::new("psu", "PSU"), 1, Decimal::from(90))
            .expect_err("read-only");
        assert_eq!(error, DomainError::QuoteReadOnly { folio: 42 });
        assert!(quote.compute_totals(&[]).is_err());
        assert!(quote.assign_folio(Folio(43)).is_err());
    }

    #[test]
    fn restore_recomputes_totals_and_checks_numbering() {
        let mut quote = quote_with_lines();
        let mx = TaxCatalog.resolve("MX").expect("mx");
        quote.compute_totals(&[&mx]).expect("totals");

        let restored = Quote::restore(
            Folio(7),
            quote.created_at(),
            quote.lines().to_vec(),
            quote.applied_taxes().to_vec(),
        )
        .expect("restore");
        assert_eq!(restored.total(), quote.total());
        assert_eq!(restored.folio(), Some(Folio(7)));

        let mut shuffled = quote.lines().to_vec();
        shuffled.reverse();
        assert!(Quote::restore(Folio(8), quote.created_at(), shuffled, Vec::new()).is_err());
    }
}
