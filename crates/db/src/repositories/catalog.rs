use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use rigquote_core::catalog::{InMemoryCatalog, NamedPromotion};
use rigquote_core::domain::component::Component;
use rigquote_core::domain::promotion::Promotion;
use rigquote_core::domain::supplier::Supplier;

use super::codec::{column, json, to_json};
use super::{CatalogRepository, RepositoryError};
use crate::DbPool;

/// Catalog storage. Components and promotions are kept as JSON documents so a
/// PC keeps its full sub-component tree.
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_supplier(row: &SqliteRow) -> Result<Supplier, RepositoryError> {
    let key: String = column(row, "key")?;
    let name: String = column(row, "name")?;
    let legal_name: String = column(row, "legal_name")?;
    Ok(Supplier::new(key, name, legal_name))
}

fn row_to_promotion(row: &SqliteRow) -> Result<NamedPromotion, RepositoryError> {
    let id: String = column(row, "id")?;
    let promotion: Promotion = json(row, "definition_json")?;
    Ok(NamedPromotion { id, promotion })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn save_component(&self, component: &Component) -> Result<(), RepositoryError> {
        component.finalize()?;
        let definition = to_json(component)?;

        sqlx::query(
            "INSERT INTO component (id, description, composite, definition_json, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 description = excluded.description,
                 composite = excluded.composite,
                 definition_json = excluded.definition_json,
                 updated_at = excluded.updated_at",
        )
        .bind(component.id.as_str())
        .bind(&component.description)
        .bind(component.is_composite())
        .bind(&definition)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            event_name = "db.component.saved",
            component_id = %component.id,
            composite = component.is_composite(),
            "component stored"
        );
        Ok(())
    }

    async fn save_promotion(&self, promotion: &NamedPromotion) -> Result<(), RepositoryError> {
        let definition = to_json(&promotion.promotion)?;

        sqlx::query(
            "INSERT INTO promotion (id, definition_json, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 definition_json = excluded.definition_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&promotion.id)
        .bind(&definition)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(event_name = "db.promotion.saved", promotion_id = %promotion.id, "promotion stored");
        Ok(())
    }

    async fn save_supplier(&self, supplier: &Supplier) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO supplier (key, name, legal_name, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 name = excluded.name,
                 legal_name = excluded.legal_name,
                 updated_at = excluded.updated_at",
        )
        .bind(&supplier.key.0)
        .bind(&supplier.name)
        .bind(&supplier.legal_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(event_name = "db.supplier.saved", supplier_key = %supplier.key, "supplier stored");
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<InMemoryCatalog, RepositoryError> {
        let component_rows: Vec<SqliteRow> =
            sqlx::query("SELECT definition_json FROM component ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
        let components = component_rows
            .iter()
            .map(|row| json::<Component>(row, "definition_json"))
            .collect::<Result<Vec<_>, _>>()?;

        let promotion_rows: Vec<SqliteRow> =
            sqlx::query("SELECT id, definition_json FROM promotion ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
        let promotions =
            promotion_rows.iter().map(row_to_promotion).collect::<Result<Vec<_>, _>>()?;

        let supplier_rows: Vec<SqliteRow> =
            sqlx::query("SELECT key, name, legal_name FROM supplier ORDER BY key ASC")
                .fetch_all(&self.pool)
                .await?;
        let suppliers = supplier_rows.iter().map(row_to_supplier).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            event_name = "db.catalog.loaded",
            components = components.len(),
            promotions = promotions.len(),
            suppliers = suppliers.len(),
            "catalog snapshot loaded"
        );
        Ok(InMemoryCatalog::new(components, promotions, suppliers)?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use rigquote_core::catalog::{ComponentCatalog, NamedPromotion, SupplierCatalog};
    use rigquote_core::domain::component::{Component, ComponentId};
    use rigquote_core::domain::promotion::Promotion;
    use rigquote_core::domain::supplier::{Supplier, SupplierKey};
    use rigquote_core::errors::DomainError;

    use super::SqlCatalogRepository;
    use crate::repositories::{CatalogRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCatalogRepository::new(pool)
    }

    fn office_pc() -> Component {
        let cpu = Component::part("cpu-r5", "Ryzen 5", Decimal::from(120), Decimal::from(180))
            .expect("part");
        let board = Component::part("mb-b650", "B650 board", Decimal::from(90), Decimal::from(140))
            .expect("part")
            .with_promotion(
                Promotion::no_discount().with_flat_percent(Decimal::from(5)).expect("promo"),
            );
        let mut pc = Component::pc("pc-office", "Office PC").with_promotion(
            Promotion::buy_n_pay_m(3, 2)
                .and_then(|promotion| promotion.with_tiers([(10, Decimal::from(15))]))
                .expect("promo"),
        );
        pc.add_sub_component(cpu).expect("add");
        pc.add_sub_component(board).expect("add");
        pc
    }

    #[tokio::test]
    async fn snapshot_restores_component_trees_and_promotions() {
        let repo = repo().await;
        let pc = office_pc();
        repo.save_component(&pc).await.expect("save pc");
        repo.save_promotion(&NamedPromotion {
            id: "summer".to_string(),
            promotion: Promotion::no_discount().with_flat_percent(Decimal::from(20)).expect("promo"),
        })
        .await
        .expect("save promotion");
        repo.save_supplier(&Supplier::new("ACME", "Acme", "Acme Components SA de CV"))
            .await
            .expect("save supplier");

        let snapshot = repo.load_snapshot().await.expect("snapshot");

        let restored = snapshot.find_component(&ComponentId::new("pc-office")).expect("pc");
        assert_eq!(restored, &pc);
        assert_eq!(restored.unit_price(), pc.unit_price());
        assert!(snapshot.find_promotion("summer").is_some());
        assert!(snapshot.find_supplier(&SupplierKey::new("ACME")).is_some());
    }

    #[tokio::test]
    async fn saving_again_replaces_the_definition() {
        let repo = repo().await;
        let part = Component::part("ssd-1tb", "1TB SSD", Decimal::from(50), Decimal::from(80))
            .expect("part");
        repo.save_component(&part).await.expect("save");

        let repriced = Component { base_price: Decimal::from(75), ..part };
        repo.save_component(&repriced).await.expect("upsert");

        let snapshot = repo.load_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.components().count(), 1);
        assert_eq!(
            snapshot.find_component(&ComponentId::new("ssd-1tb")).map(Component::list_price),
            Some(Ok(Decimal::from(75)))
        );
    }

    #[tokio::test]
    async fn empty_pc_is_rejected_before_storage() {
        let repo = repo().await;
        let error = repo
            .save_component(&Component::pc("pc-empty", "Empty"))
            .await
            .expect_err("empty pc");

        assert!(matches!(error, RepositoryError::Domain(DomainError::InvalidComponent { .. })));
        assert_eq!(repo.load_snapshot().await.expect("snapshot").components().count(), 0);
    }
}
