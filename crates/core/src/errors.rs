use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid promotion configuration: {0}")]
    InvalidPromotionConfiguration(String),
    #[error("invalid quote line for `{component_id}`: quantity must be positive, got {quantity}")]
    InvalidLine { component_id: String, quantity: i64 },
    #[error("quote has no lines to total")]
    EmptyQuote,
    #[error("unsupported tax jurisdiction `{0}`")]
    UnsupportedTaxJurisdiction(String),
    #[error("no budget is loaded for order generation")]
    BudgetNotLoaded,
    #[error("supplier `{0}` was not found")]
    SupplierNotFound(String),
    #[error("component `{0}` was not found")]
    ComponentNotFound(String),
    #[error("promotion `{0}` was not found")]
    PromotionNotFound(String),
    #[error("invalid component `{id}`: {reason}")]
    InvalidComponent { id: String, reason: String },
    #[error("quote {folio} is persisted and read-only")]
    QuoteReadOnly { folio: i64 },
    #[error("fulfillment level must be in 0..=100, got {0}")]
    InvalidFulfillmentLevel(i64),
    #[error("amount overflow while computing {0}")]
    AmountOverflow(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Stable snake_case class used in logs and CLI payloads.
    pub fn class(&self) -> &'static str {
        match self {
            Self::InvalidPromotionConfiguration(_) => "invalid_promotion_configuration",
            Self::InvalidLine { .. } => "invalid_line",
            Self::EmptyQuote => "empty_quote",
            Self::UnsupportedTaxJurisdiction(_) => "unsupported_tax_jurisdiction",
            Self::BudgetNotLoaded => "budget_not_loaded",
            Self::SupplierNotFound(_) => "supplier_not_found",
            Self::ComponentNotFound(_) => "component_not_found",
            Self::PromotionNotFound(_) => "promotion_not_found",
            Self::InvalidComponent { .. } => "invalid_component",
            Self::QuoteReadOnly { .. } => "quote_read_only",
            Self::InvalidFulfillmentLevel(_) => "invalid_fulfillment_level",
            Self::AmountOverflow(_) => "amount_overflow",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}
