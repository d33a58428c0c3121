use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use rigquote_core::domain::order::{
    ArticleId, FulfillmentLevel, Order, OrderLine, OrderNumber,
};
use rigquote_core::domain::supplier::{Supplier, SupplierKey};

use super::codec::{column, date, decimal, format_date};
use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_line(row: &SqliteRow) -> Result<OrderLine, RepositoryError> {
    let article_id: String = column(row, "article_id")?;
    Ok(OrderLine {
        article_id: ArticleId::new(article_id),
        description: column(row, "description")?,
        quantity: column(row, "quantity")?,
        unit_price: decimal(row, "unit_price")?,
        line_total: decimal(row, "line_total")?,
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn save(&self, mut order: Order) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let supplier_known: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM supplier WHERE key = ?")
                .bind(&order.supplier().key.0)
                .fetch_optional(&mut *tx)
                .await?;
        if supplier_known.is_none() {
            return Err(RepositoryError::Conflict(format!(
                "supplier `{}` is not registered",
                order.supplier().key
            )));
        }

        let requested = order.number();
        if requested.is_assigned() {
            let taken: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM purchase_order WHERE order_number = ?")
                    .bind(requested.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            if taken.is_some() {
                return Err(RepositoryError::Conflict(format!(
                    "order number {requested} already exists"
                )));
            }
        }

        let inserted = sqlx::query(
            "INSERT INTO purchase_order (order_number, supplier_key, issue_date, delivery_date,
                                         fulfillment_level, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(requested.is_assigned().then_some(requested.0))
        .bind(&order.supplier().key.0)
        .bind(format_date(order.issue_date()))
        .bind(format_date(order.delivery_date()))
        .bind(i64::from(order.fulfillment_level()))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        let number = OrderNumber(inserted.last_insert_rowid());

        for (index, line) in order.lines().iter().enumerate() {
            sqlx::query(
                "INSERT INTO purchase_order_line (order_number, position, article_id, description,
                                                  quantity, unit_price, line_total)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(number.0)
            .bind(index as i64 + 1)
            .bind(&line.article_id.0)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price.to_string())
            .bind(line.line_total.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        order.assign_number(number)?;

        tracing::info!(
            event_name = "db.order.saved",
            order_number = number.0,
            supplier_key = %order.supplier().key,
            lines = order.lines().len(),
            "order persisted"
        );
        Ok(order)
    }

    async fn find_by_number(&self, number: OrderNumber) -> Result<Option<Order>, RepositoryError> {
        let header = sqlx::query(
            "SELECT o.order_number, o.issue_date, o.delivery_date, o.fulfillment_level,
                    s.key AS supplier_key, s.name AS supplier_name, s.legal_name AS supplier_legal_name
             FROM purchase_order o
             JOIN supplier s ON s.key = o.supplier_key
             WHERE o.order_number = ?",
        )
        .bind(number.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let supplier_key: String = column(&header, "supplier_key")?;
        let supplier = Supplier {
            key: SupplierKey::new(supplier_key),
            name: column(&header, "supplier_name")?,
            legal_name: column(&header, "supplier_legal_name")?,
        };
        let level: i64 = column(&header, "fulfillment_level")?;

        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT article_id, description, quantity, unit_price, line_total
             FROM purchase_order_line WHERE order_number = ? ORDER BY position ASC",
        )
        .bind(number.0)
        .fetch_all(&self.pool)
        .await?;
        let lines = rows.iter().map(row_to_line).collect::<Result<Vec<_>, _>>()?;

        let order = Order::new(
            number,
            supplier,
            date(&header, "issue_date")?,
            date(&header, "delivery_date")?,
            FulfillmentLevel::new(level)?,
        )
        .with_lines(lines);
        Ok(Some(order))
    }
}
