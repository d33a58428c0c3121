use async_trait::async_trait;
use thiserror::Error;

use rigquote_core::catalog::{InMemoryCatalog, NamedPromotion};
use rigquote_core::domain::component::Component;
use rigquote_core::domain::order::{Order, OrderNumber};
use rigquote_core::domain::quote::{Folio, Quote};
use rigquote_core::domain::supplier::Supplier;
use rigquote_core::errors::DomainError;

pub mod catalog;
pub mod memory;
pub mod order;
pub mod quote;

mod codec;

pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryOrderRepository, InMemoryQuoteRepository};
pub use order::SqlOrderRepository;
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RepositoryError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Decode(_) => "decode",
            Self::Conflict(_) => "conflict",
            Self::Domain(error) => error.class(),
        }
    }
}

/// Persistence sink for quotes. Saving assigns the folio.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Stores a quote that has no folio yet and returns it with the assigned
    /// folio. A quote that already has one fails with `QuoteReadOnly`.
    async fn save(&self, quote: Quote) -> Result<Quote, RepositoryError>;
    async fn find_by_folio(&self, folio: Folio) -> Result<Option<Quote>, RepositoryError>;
}

/// Persistence sink for supplier orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores an order. An unassigned number is allocated by the store; an
    /// explicit number is kept and must not already exist.
    async fn save(&self, order: Order) -> Result<Order, RepositoryError>;
    async fn find_by_number(&self, number: OrderNumber) -> Result<Option<Order>, RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn save_component(&self, component: &Component) -> Result<(), RepositoryError>;
    async fn save_promotion(&self, promotion: &NamedPromotion) -> Result<(), RepositoryError>;
    async fn save_supplier(&self, supplier: &Supplier) -> Result<(), RepositoryError>;
    async fn load_snapshot(&self) -> Result<InMemoryCatalog, RepositoryError>;
}

fn ensure_saveable(quote: &Quote) -> Result<(), RepositoryError> {
    if let Some(folio) = quote.folio() {
        return Err(DomainError::QuoteReadOnly { folio: folio.0 }.into());
    }
    if quote.lines().is_empty() {
        return Err(DomainError::EmptyQuote.into());
    }
    Ok(())
}
