use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::SupplierCatalog;
use crate::domain::order::{FulfillmentLevel, Order, OrderLine, OrderNumber};
use crate::domain::supplier::SupplierKey;
use crate::errors::DomainError;
use crate::ordering::budget::{ArticleDatum, Budget};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub supplier_key: SupplierKey,
    pub order_number: OrderNumber,
    pub fulfillment_level: i64,
    pub issue_date: NaiveDate,
    pub delivery_date: NaiveDate,
}

/// Turns a loaded [`Budget`] into supplier orders.
///
/// Loading a budget is the only state change. Generating an order reads the
/// budget and the supplier catalog and returns the order, so the same budget
/// can produce several orders and a failed attempt leaves nothing behind.
pub struct OrderManager<C> {
    suppliers: C,
    budget: Option<Arc<dyn Budget>>,
}

impl<C> OrderManager<C>
where
    C: SupplierCatalog,
{
    pub fn new(suppliers: C) -> Self {
        Self { suppliers, budget: None }
    }

    pub fn has_budget(&self) -> bool {
        self.budget.is_some()
    }

    pub fn budget(&self) -> Option<&Arc<dyn Budget>> {
        self.budget.as_ref()
    }

    /// Replaces the loaded budget. An absent budget is rejected and the
    /// previously loaded one is kept.
    pub fn load_budget(&mut self, budget: Option<Arc<dyn Budget>>) -> Result<(), DomainError> {
        let budget = budget.ok_or(DomainError::BudgetNotLoaded)?;
        debug!(
            event_name = "ordering.budget.loaded",
            articles = budget.quantities_by_article().len(),
            "budget loaded for order generation"
        );
        self.budget = Some(budget);
        Ok(())
    }

    pub fn generate_order(&self, request: &OrderRequest) -> Result<Order, DomainError> {
        let budget = self.budget.as_ref().ok_or(DomainError::BudgetNotLoaded)?;

        let supplier = match self.suppliers.find_supplier(&request.supplier_key) {
            Some(supplier) => supplier.clone(),
            None => {
                warn!(
                    event_name = "ordering.supplier_missing",
                    supplier_key = %request.supplier_key,
                    "order generation refused for unknown supplier"
                );
                return Err(DomainError::SupplierNotFound(request.supplier_key.0.clone()));
            }
        };
        let fulfillment_level = FulfillmentLevel::new(request.fulfillment_level)?;

        let lines = budget
            .quantities_by_article()
            .into_iter()
            .map(|(article_id, quantity)| {
                let description = budget.description_of(&article_id).unwrap_or_default();
                let data = budget.data_of(&article_id);
                let datum = |key: ArticleDatum| data.get(&key).copied().unwrap_or(Decimal::ZERO);
                OrderLine {
                    description,
                    quantity,
                    unit_price: datum(ArticleDatum::UnitPrice),
                    line_total: datum(ArticleDatum::LineTotal),
                    article_id,
                }
            })
            .collect();

        let order = Order::new(
            request.order_number,
            supplier,
            request.issue_date,
            request.delivery_date,
            fulfillment_level,
        )
        .with_lines(lines);

        info!(
            event_name = "ordering.order.generated",
            supplier_key = %request.supplier_key,
            order_number = order.number().0,
            lines = order.lines().len(),
            total = %order.total(),
            "order generated from budget"
        );
        Ok(order)
    }
}
