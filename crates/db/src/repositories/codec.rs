//! Column encodings shared by the sqlite repositories.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::RepositoryError;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn column<T>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("column `{name}`: {e}")))
}

pub(crate) fn decimal(row: &SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = column(row, name)?;
    Decimal::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("column `{name}` holds `{raw}`: {e}")))
}

pub(crate) fn timestamp(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("column `{name}` holds `{raw}`: {e}")))
}

pub(crate) fn date(row: &SqliteRow, name: &str) -> Result<NaiveDate, RepositoryError> {
    let raw: String = column(row, name)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("column `{name}` holds `{raw}`: {e}")))
}

pub(crate) fn json<T: DeserializeOwned>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError> {
    let raw: String = column(row, name)?;
    serde_json::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("column `{name}` is not valid json: {e}")))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
