use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::supplier::Supplier;
use crate::errors::DomainError;

/// Order number; `0` until the persistence layer assigns one. Only positive
/// numbers count as assigned.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OrderNumber(pub i64);

impl OrderNumber {
    pub const UNASSIGNED: Self = Self(0);

    pub fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percentage of the order fulfilled, `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct FulfillmentLevel(u8);

impl FulfillmentLevel {
    pub const COMPLETE: Self = Self(100);

    pub fn new(value: i64) -> Result<Self, DomainError> {
        match u8::try_from(value) {
            Ok(level) if level <= 100 => Ok(Self(level)),
            _ => Err(DomainError::InvalidFulfillmentLevel(value)),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for FulfillmentLevel {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FulfillmentLevel> for i64 {
    fn from(level: FulfillmentLevel) -> Self {
        i64::from(level.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub article_id: ArticleId,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A supplier order. The supplier is fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    number: OrderNumber,
    issue_date: NaiveDate,
    delivery_date: NaiveDate,
    fulfillment_level: FulfillmentLevel,
    supplier: Supplier,
    lines: Vec<OrderLine>,
}

impl Order {
    pub fn new(
        number: OrderNumber,
        supplier: Supplier,
        issue_date: NaiveDate,
        delivery_date: NaiveDate,
        fulfillment_level: FulfillmentLevel,
    ) -> Self {
        Self { number, issue_date, delivery_date, fulfillment_level, supplier, lines: Vec::new() }
    }

    pub fn with_lines(mut self, lines: Vec<OrderLine>) -> Self {
        self.lines = lines;
        self
    }

    pub fn push_line(&mut self, line: OrderLine) {
        self.lines.push(line);
    }

    pub fn number(&self) -> OrderNumber {
        self.number
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }

    pub fn fulfillment_level(&self) -> FulfillmentLevel {
        self.fulfillment_level
    }

    pub fn supplier(&self) -> &Supplier {
        &self.supplier
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.line_total).sum()
    }

    /// Takes the number handed back by the persistence layer.
    pub fn assign_number(&mut self, number: OrderNumber) -> Result<(), DomainError> {
        if !number.is_assigned() {
            return Err(DomainError::InvariantViolation(
                "persistence returned an unassigned order number".to_string(),
            ));
        }
        self.number = number;
        Ok(())
    }
}
