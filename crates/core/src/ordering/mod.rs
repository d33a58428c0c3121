pub mod budget;
pub mod manager;

pub use budget::{ArticleDatum, Budget, QuoteBudget};
pub use manager::{OrderManager, OrderRequest};
