//! TOML catalog files.
//!
//! ```toml
//! [[suppliers]]
//! key = "ACME"
//! name = "Acme"
//! legal_name = "Acme Components SA de CV"
//!
//! [[promotions]]
//! id = "volume"
//! promotion = { base = { kind = "no_discount" }, layers = [
//!     { kind = "tiered_quantity", tiers = [{ min_quantity = 5, percent = 10 }] },
//! ] }
//!
//! [[components]]
//! id = "cpu-r7"
//! description = "Ryzen 7"
//! cost = "220"
//! base_price = "300"
//! promotion_ref = "volume"
//!
//! [[components]]
//! id = "pc-gamer"
//! description = "Gaming PC"
//! parts = ["cpu-r7"]
//! ```
//!
//! A component with `parts` is a PC assembled from components declared
//! earlier in the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use rigquote_core::catalog::{InMemoryCatalog, NamedPromotion};
use rigquote_core::domain::component::Component;
use rigquote_core::domain::promotion::Promotion;
use rigquote_core::domain::supplier::Supplier;
use rigquote_core::errors::DomainError;

#[derive(Debug, Error)]
pub enum CatalogFileError {
    #[error("could not read catalog file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    suppliers: Vec<SupplierEntry>,
    #[serde(default)]
    promotions: Vec<NamedPromotion>,
    #[serde(default)]
    components: Vec<ComponentEntry>,
}

#[derive(Debug, Deserialize)]
struct SupplierEntry {
    key: String,
    name: String,
    legal_name: String,
}

#[derive(Debug, Deserialize)]
struct ComponentEntry {
    id: String,
    description: String,
    #[serde(default)]
    brand: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    cost: Decimal,
    #[serde(default)]
    base_price: Decimal,
    #[serde(default)]
    promotion: Option<Promotion>,
    #[serde(default)]
    promotion_ref: Option<String>,
    #[serde(default)]
    parts: Vec<String>,
}

pub fn load(path: &Path) -> Result<InMemoryCatalog, CatalogFileError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CatalogFileError::Read { path: path.to_path_buf(), source })?;
    parse(&raw).map_err(|error| match error {
        ParseError::Toml(source) => CatalogFileError::Parse { path: path.to_path_buf(), source },
        ParseError::Domain(error) => CatalogFileError::Domain(error),
    })
}

enum ParseError {
    Toml(toml::de::Error),
    Domain(DomainError),
}

fn parse(raw: &str) -> Result<InMemoryCatalog, ParseError> {
    let document: CatalogDocument = toml::from_str(raw).map_err(ParseError::Toml)?;
    build(document).map_err(ParseError::Domain)
}

fn build(document: CatalogDocument) -> Result<InMemoryCatalog, DomainError> {
    let named: BTreeMap<&str, &Promotion> = document
        .promotions
        .iter()
        .map(|entry| (entry.id.as_str(), &entry.promotion))
        .collect();

    let mut declared: BTreeMap<String, Component> = BTreeMap::new();
    let mut components = Vec::with_capacity(document.components.len());
    for entry in document.components {
        let component = build_component(entry, &named, &declared)?;
        declared.insert(component.id.0.clone(), component.clone());
        components.push(component);
    }

    let suppliers = document
        .suppliers
        .into_iter()
        .map(|entry| Supplier::new(entry.key, entry.name, entry.legal_name))
        .collect();

    InMemoryCatalog::new(components, document.promotions, suppliers)
}

fn build_component(
    entry: ComponentEntry,
    named: &BTreeMap<&str, &Promotion>,
    declared: &BTreeMap<String, Component>,
) -> Result<Component, DomainError> {
    let promotion = match (entry.promotion, entry.promotion_ref) {
        (Some(_), Some(_)) => {
            return Err(DomainError::InvalidComponent {
                id: entry.id,
                reason: "set either `promotion` or `promotion_ref`, not both".to_string(),
            })
        }
        (Some(promotion), None) => Some(promotion),
        (None, Some(reference)) => Some(
            named
                .get(reference.as_str())
                .map(|promotion| (*promotion).clone())
                .ok_or(DomainError::PromotionNotFound(reference))?,
        ),
        (None, None) => None,
    };

    let mut component = if entry.parts.is_empty() {
        Component::part(entry.id, entry.description, entry.cost, entry.base_price)?
    } else {
        let mut pc = Component::pc(entry.id, entry.description);
        pc.cost = entry.cost;
        pc.base_price = entry.base_price;
        for part in &entry.parts {
            let sub = declared
                .get(part)
                .cloned()
                .ok_or_else(|| DomainError::ComponentNotFound(part.clone()))?;
            pc.add_sub_component(sub)?;
        }
        pc
    };

    component = component.with_brand_model(entry.brand, entry.model);
    if let Some(promotion) = promotion {
        component = component.with_promotion(promotion);
    }
    Ok(component)
}
