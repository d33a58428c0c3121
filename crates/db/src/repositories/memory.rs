use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use rigquote_core::catalog::{InMemoryCatalog, NamedPromotion};
use rigquote_core::domain::component::{Component, ComponentId};
use rigquote_core::domain::order::{Order, OrderNumber};
use rigquote_core::domain::quote::{Folio, Quote};
use rigquote_core::domain::supplier::{Supplier, SupplierKey};

use super::{
    ensure_saveable, CatalogRepository, OrderRepository, QuoteRepository, RepositoryError,
};

#[derive(Default)]
struct QuoteStore {
    last_folio: i64,
    quotes: HashMap<i64, Quote>,
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    store: RwLock<QuoteStore>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn save(&self, mut quote: Quote) -> Result<Quote, RepositoryError> {
        ensure_saveable(&quote)?;
        let mut store = self.store.write().await;
        let folio = Folio(store.last_folio + 1);
        quote.assign_folio(folio)?;
        store.last_folio = folio.0;
        store.quotes.insert(folio.0, quote.clone());
        Ok(quote)
    }

    async fn find_by_folio(&self, folio: Folio) -> Result<Option<Quote>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.quotes.get(&folio.0).cloned())
    }
}

#[derive(Default)]
struct OrderStore {
    last_number: i64,
    orders: HashMap<i64, Order>,
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    store: RwLock<OrderStore>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let mut store = self.store.write().await;
        let number = match order.number() {
            requested if requested.is_assigned() => {
                if store.orders.contains_key(&requested.0) {
                    return Err(RepositoryError::Conflict(format!(
                        "order number {requested} already exists"
                    )));
                }
                requested
            }
            _ => OrderNumber(store.last_number + 1),
        };
        order.assign_number(number)?;
        store.last_number = store.last_number.max(number.0);
        store.orders.insert(number.0, order.clone());
        Ok(order)
    }

    async fn find_by_number(&self, number: OrderNumber) -> Result<Option<Order>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.orders.get(&number.0).cloned())
    }
}

#[derive(Default)]
struct CatalogStore {
    components: BTreeMap<ComponentId, Component>,
    promotions: BTreeMap<String, NamedPromotion>,
    suppliers: BTreeMap<SupplierKey, Supplier>,
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    store: RwLock<CatalogStore>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn save_component(&self, component: &Component) -> Result<(), RepositoryError> {
        component.finalize()?;
        let mut store = self.store.write().await;
        store.components.insert(component.id.clone(), component.clone());
        Ok(())
    }

    async fn save_promotion(&self, promotion: &NamedPromotion) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        store.promotions.insert(promotion.id.clone(), promotion.clone());
        Ok(())
    }

    async fn save_supplier(&self, supplier: &Supplier) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        store.suppliers.insert(supplier.key.clone(), supplier.clone());
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<InMemoryCatalog, RepositoryError> {
        let store = self.store.read().await;
        Ok(InMemoryCatalog::new(
            store.components.values().cloned().collect(),
            store.promotions.values().cloned().collect(),
            store.suppliers.values().cloned().collect(),
        )?)
    }
}
