use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money;
use crate::domain::order::ArticleId;
use crate::domain::quote::Quote;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleDatum {
    UnitPrice,
    LineTotal,
}

/// Read-only view of anything order generation can consume.
pub trait Budget: Send + Sync {
    /// Quantity per article, in the order lines should be emitted.
    fn quantities_by_article(&self) -> Vec<(ArticleId, i64)>;
    fn description_of(&self, article: &ArticleId) -> Option<String>;
    fn data_of(&self, article: &ArticleId) -> BTreeMap<ArticleDatum, Decimal>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct BudgetEntry {
    article: ArticleId,
    description: String,
    quantity: i64,
    unit_price: Decimal,
    line_total: Decimal,
}

/// [`Budget`] backed by a quote. Lines for the same component are grouped in
/// first-appearance order: quantities and amounts are summed and the unit
/// price of the first such line is kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteBudget {
    quote: Quote,
    entries: Vec<BudgetEntry>,
}

impl QuoteBudget {
    pub fn new(quote: Quote) -> Result<Self, DomainError> {
        if quote.lines().is_empty() {
            return Err(DomainError::EmptyQuote);
        }

        let mut entries: Vec<BudgetEntry> = Vec::new();
        for line in quote.lines() {
            let article = ArticleId::new(line.component.id.0.clone());
            match entries.iter_mut().find(|entry| entry.article == article) {
                Some(entry) => {
                    entry.quantity = entry.quantity.checked_add(line.quantity).ok_or_else(|| {
                        DomainError::AmountOverflow(format!("quantity of {article}"))
                    })?;
                    entry.line_total = money::add(entry.line_total, line.amount, "article total")?;
                }
                None => entries.push(BudgetEntry {
                    article,
                    description: line.component.description.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_total: line.amount,
                }),
            }
        }

        Ok(Self { quote, entries })
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    fn entry(&self, article: &ArticleId) -> Option<&BudgetEntry> {
        self.entries.iter().find(|entry| &entry.article == article)
    }
}

impl TryFrom<Option<Quote>> for QuoteBudget {
    type Error = DomainError;

    fn try_from(quote: Option<Quote>) -> Result<Self, Self::Error> {
        quote.ok_or(DomainError::BudgetNotLoaded).and_then(Self::new)
    }
}

impl Budget for QuoteBudget {
    fn quantities_by_article(&self) -> Vec<(ArticleId, i64)> {
        self.entries.iter().map(|entry| (entry.article.clone(), entry.quantity)).collect()
    }

    fn description_of(&self, article: &ArticleId) -> Option<String> {
        self.entry(article).map(|entry| entry.description.clone())
    }

    fn data_of(&self, article: &ArticleId) -> BTreeMap<ArticleDatum, Decimal> {
        self.entry(article)
            .map(|entry| {
                BTreeMap::from([
                    (ArticleDatum::UnitPrice, entry.unit_price),
                    (ArticleDatum::LineTotal, entry.line_total),
                ])
            })
            .unwrap_or_default()
    }
}
