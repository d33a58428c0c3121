use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::component::{Component, ComponentId};
use crate::domain::promotion::Promotion;
use crate::domain::supplier::{Supplier, SupplierKey};
use crate::errors::DomainError;

pub trait ComponentCatalog: Send + Sync {
    fn find_component(&self, id: &ComponentId) -> Option<&Component>;
    fn find_promotion(&self, id: &str) -> Option<&Promotion>;
}

pub trait SupplierCatalog: Send + Sync {
    fn find_supplier(&self, key: &SupplierKey) -> Option<&Supplier>;
}

impl<T: ComponentCatalog + ?Sized> ComponentCatalog for &T {
    fn find_component(&self, id: &ComponentId) -> Option<&Component> {
        (**self).find_component(id)
    }

    fn find_promotion(&self, id: &str) -> Option<&Promotion> {
        (**self).find_promotion(id)
    }
}

impl<T: SupplierCatalog + ?Sized> SupplierCatalog for &T {
    fn find_supplier(&self, key: &SupplierKey) -> Option<&Supplier> {
        (**self).find_supplier(key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPromotion {
    pub id: String,
    pub promotion: Promotion,
}

/// Read-only snapshot of components, named promotions and suppliers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryCatalog {
    components: BTreeMap<ComponentId, Component>,
    promotions: BTreeMap<String, Promotion>,
    suppliers: BTreeMap<SupplierKey, Supplier>,
}

impl InMemoryCatalog {
    /// Builds a snapshot; every component is finalized and ids must be unique.
    pub fn new(
        components: Vec<Component>,
        promotions: Vec<NamedPromotion>,
        suppliers: Vec<Supplier>,
    ) -> Result<Self, DomainError> {
        let mut catalog = Self::default();
        for component in components {
            component.finalize()?;
            let id = component.id.clone();
            if catalog.components.insert(id.clone(), component).is_some() {
                return Err(DomainError::InvariantViolation(format!(
                    "duplicate component id `{id}` in catalog"
                )));
            }
        }
        for named in promotions {
            if catalog.promotions.insert(named.id.clone(), named.promotion).is_some() {
                return Err(DomainError::InvariantViolation(format!(
                    "duplicate promotion id `{}` in catalog",
                    named.id
                )));
            }
        }
        for supplier in suppliers {
            let key = supplier.key.clone();
            if catalog.suppliers.insert(key.clone(), supplier).is_some() {
                return Err(DomainError::InvariantViolation(format!(
                    "duplicate supplier key `{key}` in catalog"
                )));
            }
        }
        Ok(catalog)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn promotions(&self) -> impl Iterator<Item = (&str, &Promotion)> {
        self.promotions.iter().map(|(id, promotion)| (id.as_str(), promotion))
    }

    pub fn suppliers(&self) -> impl Iterator<Item = &Supplier> {
        self.suppliers.values()
    }
}

impl ComponentCatalog for InMemoryCatalog {
    fn find_component(&self, id: &ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    fn find_promotion(&self, id: &str) -> Option<&Promotion> {
        self.promotions.get(id)
    }
}

impl SupplierCatalog for InMemoryCatalog {
    fn find_supplier(&self, key: &SupplierKey) -> Option<&Supplier> {
        self.suppliers.get(key)
    }
}
