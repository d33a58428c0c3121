use sqlx::sqlite::SqliteRow;

use rigquote_core::domain::quote::{AppliedTax, ComponentRef, Folio, Quote, QuoteLine};

use super::codec::{column, decimal, json, timestamp, to_json};
use super::{ensure_saveable, QuoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_line(row: &SqliteRow) -> Result<QuoteLine, RepositoryError> {
    let line_number: i64 = column(row, "line_number")?;
    let component_id: String = column(row, "component_id")?;
    let description: String = column(row, "description")?;

    Ok(QuoteLine {
        line_number: u32::try_from(line_number)
            .map_err(|_| RepositoryError::Decode(format!("line number {line_number} out of range")))?,
        component: ComponentRef::new(component_id, description),
        quantity: column(row, "quantity")?,
        unit_price: decimal(row, "unit_price")?,
        amount: decimal(row, "amount")?,
    })
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn save(&self, mut quote: Quote) -> Result<Quote, RepositoryError> {
        ensure_saveable(&quote)?;
        let applied_taxes_json = to_json(&quote.applied_taxes())?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO quote (created_at, subtotal, tax_amount, total, applied_taxes_json)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(quote.created_at().to_rfc3339())
        .bind(quote.subtotal().to_string())
        .bind(quote.tax_amount().to_string())
        .bind(quote.total().to_string())
        .bind(&applied_taxes_json)
        .execute(&mut *tx)
        .await?;
        let folio = Folio(inserted.last_insert_rowid());

        for line in quote.lines() {
            sqlx::query(
                "INSERT INTO quote_line (folio, line_number, component_id, description,
                                         quantity, unit_price, amount)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(folio.0)
            .bind(i64::from(line.line_number))
            .bind(line.component.id.as_str())
            .bind(&line.component.description)
            .bind(line.quantity)
            .bind(line.unit_price.to_string())
            .bind(line.amount.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        quote.assign_folio(folio)?;

        tracing::info!(
            event_name = "db.quote.saved",
            folio = folio.0,
            lines = quote.lines().len(),
            total = %quote.total(),
            "quote persisted"
        );
        Ok(quote)
    }

    async fn find_by_folio(&self, folio: Folio) -> Result<Option<Quote>, RepositoryError> {
        let header = sqlx::query(
            "SELECT folio, created_at, applied_taxes_json FROM quote WHERE folio = ?",
        )
        .bind(folio.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let created_at = timestamp(&header, "created_at")?;
        let applied_taxes: Vec<AppliedTax> = json(&header, "applied_taxes_json")?;

        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT line_number, component_id, description, quantity, unit_price, amount
             FROM quote_line WHERE folio = ? ORDER BY line_number ASC",
        )
        .bind(folio.0)
        .fetch_all(&self.pool)
        .await?;
        let lines = rows.iter().map(row_to_line).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Quote::restore(folio, created_at, lines, applied_taxes)?))
    }
}
