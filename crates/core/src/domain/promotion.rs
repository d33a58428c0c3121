//! Layered promotions.
//!
//! A [`Promotion`] is one [`BasePromotion`] wrapped by zero or more
//! [`AccumulableDiscount`] layers. Evaluation runs innermost-first: the base
//! resolves the starting amount and every layer transforms the amount produced
//! beneath it, in attachment order.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money;
use crate::errors::DomainError;

/// A discount percentage in `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(DomainError::InvalidPromotionConfiguration(format!(
                "percentage must be in 0..=100, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// Multiplier that keeps the non-discounted share of an amount.
    pub fn retained_factor(self) -> Decimal {
        Decimal::ONE - self.0 / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for Decimal {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// "Take `take` units, pay for `pay` of them" within every complete group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BuyNPayMSpec", into = "BuyNPayMSpec")]
pub struct BuyNPayM {
    take: i64,
    pay: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct BuyNPayMSpec {
    take: i64,
    pay: i64,
}

impl BuyNPayM {
    pub fn new(take: i64, pay: i64) -> Result<Self, DomainError> {
        if pay <= 0 {
            return Err(DomainError::InvalidPromotionConfiguration(format!(
                "buy {take} pay {pay}: paid units must be positive"
            )));
        }
        if take <= pay {
            return Err(DomainError::InvalidPromotionConfiguration(format!(
                "buy {take} pay {pay}: group size must exceed paid units"
            )));
        }
        Ok(Self { take, pay })
    }

    pub fn take(&self) -> i64 {
        self.take
    }

    pub fn pay(&self) -> i64 {
        self.pay
    }

    /// Units charged for `quantity`: complete groups pay `pay` each, the
    /// remainder outside a complete group pays in full.
    pub fn payable_units(&self, quantity: i64) -> i64 {
        let full_groups = quantity / self.take;
        let remainder = quantity % self.take;
        full_groups * self.pay + remainder
    }

    /// Nominal discount for whole groups. Display only; amounts always go
    /// through [`BuyNPayM::payable_units`].
    pub fn display_discount_percent(&self) -> Decimal {
        Decimal::from(self.take - self.pay) / Decimal::from(self.take) * Decimal::ONE_HUNDRED
    }
}

impl TryFrom<BuyNPayMSpec> for BuyNPayM {
    type Error = DomainError;

    fn try_from(spec: BuyNPayMSpec) -> Result<Self, Self::Error> {
        Self::new(spec.take, spec.pay)
    }
}

impl From<BuyNPayM> for BuyNPayMSpec {
    fn from(value: BuyNPayM) -> Self {
        Self { take: value.take, pay: value.pay }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BasePromotion {
    NoDiscount,
    BuyNPayM(BuyNPayM),
}

impl BasePromotion {
    pub fn calculate_amount(
        &self,
        quantity: i64,
        base_price: Decimal,
    ) -> Result<Decimal, DomainError> {
        let units = match self {
            Self::BuyNPayM(rule) if quantity > 0 => rule.payable_units(quantity),
            _ => quantity,
        };
        money::mul(base_price, Decimal::from(units), "base promotion amount")
    }

    fn describe(&self) -> String {
        match self {
            Self::NoDiscount => "no discount".to_string(),
            Self::BuyNPayM(rule) => format!("buy {} pay {}", rule.take, rule.pay),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub min_quantity: i64,
    pub percent: Percent,
}

/// Minimum quantity to discount percentage. The tier applied to a quantity is
/// the one with the largest minimum not above it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierTable(BTreeMap<i64, Percent>);

impl TierTable {
    pub fn new(tiers: impl IntoIterator<Item = Tier>) -> Result<Self, DomainError> {
        let mut table = BTreeMap::new();
        for tier in tiers {
            if tier.min_quantity <= 0 {
                return Err(DomainError::InvalidPromotionConfiguration(format!(
                    "tier minimum quantity must be positive, got {}",
                    tier.min_quantity
                )));
            }
            if table.insert(tier.min_quantity, tier.percent).is_some() {
                return Err(DomainError::InvalidPromotionConfiguration(format!(
                    "duplicate tier for minimum quantity {}",
                    tier.min_quantity
                )));
            }
        }
        if table.is_empty() {
            return Err(DomainError::InvalidPromotionConfiguration(
                "tiered discount needs at least one tier".to_string(),
            ));
        }
        Ok(Self(table))
    }

    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (i64, Decimal)>,
    ) -> Result<Self, DomainError> {
        let tiers = pairs
            .into_iter()
            .map(|(min_quantity, percent)| Ok(Tier { min_quantity, percent: Percent::new(percent)? }))
            .collect::<Result<Vec<_>, DomainError>>()?;
        Self::new(tiers)
    }

    pub fn tier_for(&self, quantity: i64) -> Option<Tier> {
        self.0
            .range(..=quantity)
            .next_back()
            .map(|(min_quantity, percent)| Tier { min_quantity: *min_quantity, percent: *percent })
    }

    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.0.iter().map(|(min_quantity, percent)| Tier { min_quantity: *min_quantity, percent: *percent })
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = DomainError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.tiers().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccumulableDiscount {
    FlatPercent { percent: Percent },
    TieredQuantity { tiers: TierTable },
}

impl AccumulableDiscount {
    pub fn flat_percent(percent: Decimal) -> Result<Self, DomainError> {
        Ok(Self::FlatPercent { percent: Percent::new(percent)? })
    }

    pub fn tiered(pairs: impl IntoIterator<Item = (i64, Decimal)>) -> Result<Self, DomainError> {
        Ok(Self::TieredQuantity { tiers: TierTable::from_pairs(pairs)? })
    }

    /// Transforms the amount produced by the layer beneath.
    pub fn apply(&self, quantity: i64, amount: Decimal) -> Result<Decimal, DomainError> {
        if quantity <= 0 {
            return Ok(amount);
        }
        let percent = match self {
            Self::FlatPercent { percent } => *percent,
            Self::TieredQuantity { tiers } => match tiers.tier_for(quantity) {
                Some(tier) => tier.percent,
                None => return Ok(amount),
            },
        };
        money::mul(amount, percent.retained_factor(), "discounted amount")
    }

    fn describe(&self) -> String {
        match self {
            Self::FlatPercent { percent } => format!("{percent} off"),
            Self::TieredQuantity { tiers } => {
                let rendered = tiers
                    .tiers()
                    .map(|tier| format!("{}+: {}", tier.min_quantity, tier.percent))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("tiered ({rendered})")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PromotionSpec", into = "PromotionSpec")]
pub enum Promotion {
    Base(BasePromotion),
    Decorated(Box<Promotion>, AccumulableDiscount),
}

/// Flat form used for catalog files and stored definitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PromotionSpec {
    base: BasePromotion,
    #[serde(default)]
    layers: Vec<AccumulableDiscount>,
}

impl Default for Promotion {
    fn default() -> Self {
        Self::no_discount()
    }
}

impl Promotion {
    pub fn no_discount() -> Self {
        Self::Base(BasePromotion::NoDiscount)
    }

    pub fn buy_n_pay_m(take: i64, pay: i64) -> Result<Self, DomainError> {
        Ok(Self::Base(BasePromotion::BuyNPayM(BuyNPayM::new(take, pay)?)))
    }

    /// Wraps the current chain with another accumulable layer.
    pub fn with_layer(self, layer: AccumulableDiscount) -> Self {
        Self::Decorated(Box::new(self), layer)
    }

    pub fn with_flat_percent(self, percent: Decimal) -> Result<Self, DomainError> {
        Ok(self.with_layer(AccumulableDiscount::flat_percent(percent)?))
    }

    pub fn with_tiers(
        self,
        pairs: impl IntoIterator<Item = (i64, Decimal)>,
    ) -> Result<Self, DomainError> {
        Ok(self.with_layer(AccumulableDiscount::tiered(pairs)?))
    }

    /// Fails with `AmountOverflow` when an intermediate amount leaves the
    /// `Decimal` range.
    pub fn calculate_amount(
        &self,
        quantity: i64,
        base_price: Decimal,
    ) -> Result<Decimal, DomainError> {
        match self {
            Self::Base(base) => base.calculate_amount(quantity, base_price),
            Self::Decorated(inner, layer) => {
                let amount = inner.calculate_amount(quantity, base_price)?;
                layer.apply(quantity, amount)
            }
        }
    }

    pub fn base(&self) -> &BasePromotion {
        match self {
            Self::Base(base) => base,
            Self::Decorated(inner, _) => inner.base(),
        }
    }

    /// Accumulable layers in attachment order.
    pub fn layers(&self) -> Vec<&AccumulableDiscount> {
        let mut layers = Vec::new();
        let mut current = self;
        while let Self::Decorated(inner, layer) = current {
            layers.push(layer);
            current = inner;
        }
        layers.reverse();
        layers
    }

    pub fn describe(&self) -> String {
        std::iter::once(self.base().describe())
            .chain(self.layers().into_iter().map(AccumulableDiscount::describe))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl From<PromotionSpec> for Promotion {
    fn from(spec: PromotionSpec) -> Self {
        spec.layers.into_iter().fold(Self::Base(spec.base), Self::with_layer)
    }
}

impl From<Promotion> for PromotionSpec {
    fn from(promotion: Promotion) -> Self {
        Self { base: *promotion.base(), layers: promotion.layers().into_iter().cloned().collect() }
    }
}
