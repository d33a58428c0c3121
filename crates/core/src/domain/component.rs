use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money;
use crate::domain::promotion::Promotion;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub String);

impl ComponentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
    #[default]
    Part,
    Pc {
        #[serde(default)]
        sub_components: Vec<Component>,
    },
}

/// A hardware part or a composite PC assembled from parts.
///
/// For parts the list price is `base_price`. For composites it is the sum of
/// the sub-components' unit prices and `base_price` is not used for pricing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    pub cost: Decimal,
    pub base_price: Decimal,
    #[serde(default)]
    pub promotion: Option<Promotion>,
    #[serde(default)]
    pub kind: ComponentKind,
}

impl Component {
    pub fn part(
        id: impl Into<String>,
        description: impl Into<String>,
        cost: Decimal,
        base_price: Decimal,
    ) -> Result<Self, DomainError> {
        let component = Self {
            id: ComponentId::new(id),
            description: description.into(),
            brand: String::new(),
            model: String::new(),
            cost,
            base_price,
            promotion: None,
            kind: ComponentKind::Part,
        };
        component.validate_amounts()?;
        Ok(component)
    }

    /// An empty composite; call [`Component::finalize`] once parts are added.
    pub fn pc(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ComponentId::new(id),
            description: description.into(),
            brand: String::new(),
            model: String::new(),
            cost: Decimal::ZERO,
            base_price: Decimal::ZERO,
            promotion: None,
            kind: ComponentKind::Pc { sub_components: Vec::new() },
        }
    }

    pub fn with_brand_model(mut self, brand: impl Into<String>, model: impl Into<String>) -> Self {
        self.brand = brand.into();
        self.model = model.into();
        self
    }

    pub fn with_promotion(mut self, promotion: Promotion) -> Self {
        self.promotion = Some(promotion);
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, ComponentKind::Pc { .. })
    }

    pub fn sub_components(&self) -> &[Component] {
        match &self.kind {
            ComponentKind::Part => &[],
            ComponentKind::Pc { sub_components } => sub_components,
        }
    }

    pub fn add_sub_component(&mut self, component: Component) -> Result<(), DomainError> {
        if let ComponentKind::Pc { sub_components } = &mut self.kind {
            sub_components.push(component);
            return Ok(());
        }
        Err(self.invalid("parts cannot hold sub-components"))
    }

    pub fn remove_sub_component(&mut self, id: &ComponentId) -> Option<Component> {
        match &mut self.kind {
            ComponentKind::Part => None,
            ComponentKind::Pc { sub_components } => {
                let index = sub_components.iter().position(|component| &component.id == id)?;
                Some(sub_components.remove(index))
            }
        }
    }

    /// Checks amounts recursively and that composites are not empty.
    pub fn finalize(&self) -> Result<(), DomainError> {
        self.validate_amounts()?;
        if let ComponentKind::Pc { sub_components } = &self.kind {
            if sub_components.is_empty() {
                return Err(self.invalid("a PC needs at least one sub-component"));
            }
            for component in sub_components {
                component.finalize()?;
            }
        }
        Ok(())
    }

    /// Price before this component's own promotion.
    pub fn list_price(&self) -> Result<Decimal, DomainError> {
        match &self.kind {
            ComponentKind::Part => Ok(self.base_price),
            ComponentKind::Pc { sub_components } => {
                let prices = sub_components
                    .iter()
                    .map(Component::unit_price)
                    .collect::<Result<Vec<_>, _>>()?;
                money::sum(prices, "composite list price")
            }
        }
    }

    /// Quoted price of a single unit.
    pub fn unit_price(&self) -> Result<Decimal, DomainError> {
        self.line_amount(1)
    }

    /// Composite price: sum of sub-component unit prices through the PC's own
    /// promotion. Recomputed on every call.
    pub fn total_price(&self) -> Result<Decimal, DomainError> {
        self.unit_price()
    }

    /// Amount for `quantity` units of this component through its promotion chain.
    pub fn line_amount(&self, quantity: i64) -> Result<Decimal, DomainError> {
        let list_price = self.list_price()?;
        match &self.promotion {
            Some(promotion) => promotion.calculate_amount(quantity, list_price),
            None => money::mul(list_price, Decimal::from(quantity), "line amount"),
        }
    }

    pub fn total_cost(&self) -> Result<Decimal, DomainError> {
        match &self.kind {
            ComponentKind::Part => Ok(self.cost),
            ComponentKind::Pc { sub_components } => {
                let costs = sub_components
                    .iter()
                    .map(Component::total_cost)
                    .collect::<Result<Vec<_>, _>>()?;
                money::add(self.cost, money::sum(costs, "total cost")?, "total cost")
            }
        }
    }

    fn validate_amounts(&self) -> Result<(), DomainError> {
        if self.cost < Decimal::ZERO {
            return Err(self.invalid("cost must not be negative"));
        }
        if self.base_price < Decimal::ZERO {
            return Err(self.invalid("base price must not be negative"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> DomainError {
        DomainError::InvalidComponent { id: self.id.0.clone(), reason: reason.to_string() }
    }
}
