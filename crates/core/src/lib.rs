pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ordering;
pub mod pricing;

pub use catalog::{ComponentCatalog, InMemoryCatalog, NamedPromotion, SupplierCatalog};
pub use domain::component::{Component, ComponentId, ComponentKind};
pub use domain::order::{ArticleId, FulfillmentLevel, Order, OrderLine, OrderNumber};
pub use domain::promotion::{AccumulableDiscount, BasePromotion, BuyNPayM, Percent, Promotion};
pub use domain::quote::{AppliedTax, ComponentRef, Folio, Quote, QuoteLine};
pub use domain::supplier::{Supplier, SupplierKey};
pub use domain::tax::{FixedRateTax, TaxCatalog, TaxJurisdiction, TaxStrategy};
pub use errors::DomainError;
pub use ordering::{ArticleDatum, Budget, OrderManager, OrderRequest, QuoteBudget};
pub use pricing::{LineRequest, PricedQuote, PricingTrace, QuotePricer, QuoteRequest};
