use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money;
use crate::errors::DomainError;

pub trait TaxStrategy: Send + Sync {
    fn code(&self) -> &str;
    fn rate(&self) -> Decimal;
    fn calculate(&self, amount: Decimal) -> Result<Decimal, DomainError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxJurisdiction {
    /// Mexico, IVA.
    #[serde(rename = "MX")]
    Mexico,
    /// Canada, federal GST.
    #[serde(rename = "CA")]
    Canada,
    /// Honduras, ISV.
    #[serde(rename = "HN")]
    Honduras,
}

impl TaxJurisdiction {
    pub const ALL: [Self; 3] = [Self::Mexico, Self::Canada, Self::Honduras];

    pub fn code(self) -> &'static str {
        match self {
            Self::Mexico => "MX",
            Self::Canada => "CA",
            Self::Honduras => "HN",
        }
    }

    pub fn rate(self) -> Decimal {
        match self {
            Self::Mexico => Decimal::new(16, 2),
            Self::Canada => Decimal::new(5, 2),
            Self::Honduras => Decimal::new(15, 2),
        }
    }
}

impl std::str::FromStr for TaxJurisdiction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|jurisdiction| jurisdiction.code() == normalized)
            .ok_or_else(|| DomainError::UnsupportedTaxJurisdiction(value.trim().to_string()))
    }
}

/// `amount * rate` for a single jurisdiction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRateTax {
    jurisdiction: TaxJurisdiction,
}

impl FixedRateTax {
    pub fn new(jurisdiction: TaxJurisdiction) -> Self {
        Self { jurisdiction }
    }

    pub fn jurisdiction(&self) -> TaxJurisdiction {
        self.jurisdiction
    }
}

impl TaxStrategy for FixedRateTax {
    fn code(&self) -> &str {
        self.jurisdiction.code()
    }

    fn rate(&self) -> Decimal {
        self.jurisdiction.rate()
    }

    fn calculate(&self, amount: Decimal) -> Result<Decimal, DomainError> {
        money::mul(amount, self.jurisdiction.rate(), "tax amount")
    }
}

/// Recognized tax codes.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaxCatalog;

impl TaxCatalog {
    pub fn resolve(&self, code: &str) -> Result<FixedRateTax, DomainError> {
        code.parse::<TaxJurisdiction>().map(FixedRateTax::new)
    }

    /// Resolves every code or none; the first unknown code fails the list.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        codes: &[S],
    ) -> Result<Vec<FixedRateTax>, DomainError> {
        codes.iter().map(|code| self.resolve(code.as_ref())).collect()
    }

    pub fn supported_codes(&self) -> Vec<&'static str> {
        TaxJurisdiction::ALL.into_iter().map(TaxJurisdiction::code).collect()
    }
}
