//! Forecast feedback: turning a planner's stock observation into a ledger row.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::lenient;

/// Product categories with a known SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Snacks,
    Beverages,
    Cheese,
    Bakery,
    Frozen,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::Snacks,
        Product::Beverages,
        Product::Cheese,
        Product::Bakery,
        Product::Frozen,
    ];

    /// Exact, case-sensitive match on the category name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Product::Snacks => "Snacks",
            Product::Beverages => "Beverages",
            Product::Cheese => "Cheese",
            Product::Bakery => "Bakery",
            Product::Frozen => "Frozen",
        }
    }

    pub fn sku(self) -> &'static str {
        match self {
            Product::Snacks => "SKU001_Snacks",
            Product::Beverages => "SKU002_Beverages",
            Product::Cheese => "SKU003_Cheese",
            Product::Bakery => "SKU004_Bakery",
            Product::Frozen => "SKU005_Frozen",
        }
    }
}

/// Stock observation reported with a feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Overstock,
    Understock,
    Balanced,
}

impl StockStatus {
    /// Unknown text is treated as balanced (no adjustment).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Overstock" => StockStatus::Overstock,
            "Understock" => StockStatus::Understock,
            _ => StockStatus::Balanced,
        }
    }

    /// Apply the planner's correction to the naive forecast.
    pub fn adjust(self, naive: f64, value: f64) -> f64 {
        match self {
            StockStatus::Overstock => naive - value,
            StockStatus::Understock => naive + value,
            StockStatus::Balanced => naive,
        }
    }
}

/// Body of `POST /api/feedback`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default, deserialize_with = "lenient::f64_or_string")]
    pub cheese_demand: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_string")]
    pub snacks_demand: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_string")]
    pub bakery_demand: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_string")]
    pub beverages_demand: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_string")]
    pub frozen_demand: f64,
    #[serde(default)]
    pub dc: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub stock_status: String,
    #[serde(default, deserialize_with = "lenient::f64_or_string")]
    pub value: f64,
}

impl FeedbackRequest {
    /// Baseline demand field matching `product`.
    pub fn baseline_for(&self, product: Product) -> f64 {
        match product {
            Product::Snacks => self.snacks_demand,
            Product::Beverages => self.beverages_demand,
            Product::Cheese => self.cheese_demand,
            Product::Bakery => self.bakery_demand,
            Product::Frozen => self.frozen_demand,
        }
    }

    /// Derive the ledger row for a feedback submitted on `today`.
    ///
    /// An unrecognised product yields an empty sku and a zero baseline.
    pub fn to_entry(&self, today: NaiveDate) -> FeedbackEntry {
        let (sku, naive) = match Product::from_name(&self.product) {
            Some(product) => (product.sku().to_string(), self.baseline_for(product)),
            None => (String::new(), 0.0),
        };
        let status = StockStatus::parse(&self.stock_status);

        FeedbackEntry {
            week: week_number(today),
            sku,
            dc: self.dc.clone(),
            naive_forecast: naive,
            festival_adjusted_forecast: status.adjust(naive, self.value),
            actual: naive + self.value,
        }
    }
}

/// One row of the forecast ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub week: u32,
    pub sku: String,
    pub dc: String,
    pub naive_forecast: f64,
    pub festival_adjusted_forecast: f64,
    pub actual: f64,
}

/// Week of the year: `ceil((days since Jan 1 + weekday of Jan 1 + 1) / 7)`.
///
/// Weekdays count from Sunday = 0. The result is 1-based and reaches 54
/// for the last days of a leap year that starts on a Saturday.
pub fn week_number(date: NaiveDate) -> u32 {
    let days = date.ordinal0();
    let offset = NaiveDate::from_yo_opt(date.year(), 1)
        .map(|jan1| jan1.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (days + offset + 1).div_ceil(7)
}
