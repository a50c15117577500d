// ============================================================================
// Matrix Core - Price Cell
// File: crates/matrix-core/src/domain/price.rs
// Description: Package x duration price entry
// ============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cell::{CellValue, NumericCell};
use crate::error::MatrixError;

/// Price of one package for one duration, in whole currency units
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceCell {
    pub price: i64,
    pub discount_percent: u8,
    /// Charge pro rata when the subscription starts mid-period
    pub prorate: bool,
    pub effective_from: Option<NaiveDate>,
    pub effective_until: Option<NaiveDate>,
}

impl PriceCell {
    pub fn with_price(price: i64) -> Self {
        Self {
            price,
            ..Self::default()
        }
    }

    /// Price after discount, rounded half-up
    pub fn net_price(&self) -> i64 {
        let gross = i128::from(self.price) * (100 - i128::from(self.discount_percent));
        let net = (gross + 50).div_euclid(100);
        net.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_from.map_or(true, |from| from <= date)
            && self.effective_until.map_or(true, |until| date <= until)
    }
}

/// Partial update. `Some(None)` on a date clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricePatch {
    pub price: Option<i64>,
    pub discount_percent: Option<u8>,
    pub prorate: Option<bool>,
    pub effective_from: Option<Option<NaiveDate>>,
    pub effective_until: Option<Option<NaiveDate>>,
}

impl PricePatch {
    pub fn price(price: i64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }
}

impl CellValue for PriceCell {
    type Patch = PricePatch;

    fn validate(&self) -> Result<(), MatrixError> {
        if self.price < 0 {
            return Err(MatrixError::NegativePrice(self.price));
        }
        if self.discount_percent > 100 {
            return Err(MatrixError::DiscountOutOfRange(self.discount_percent));
        }
        if let (Some(from), Some(until)) = (self.effective_from, self.effective_until) {
            if from > until {
                return Err(MatrixError::InvalidEffectiveRange { from, until });
            }
        }
        Ok(())
    }

    fn merge(&self, patch: &PricePatch) -> Result<Self, MatrixError> {
        let mut next = self.clone();
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(discount) = patch.discount_percent {
            next.discount_percent = discount;
        }
        if let Some(prorate) = patch.prorate {
            next.prorate = prorate;
        }
        if let Some(from) = patch.effective_from {
            next.effective_from = from;
        }
        if let Some(until) = patch.effective_until {
            next.effective_until = until;
        }
        next.validate()?;
        Ok(next)
    }

    fn export_headers() -> &'static [&'static str] {
        &["price", "discount_percent", "prorate", "effective_from", "effective_until"]
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.price.to_string(),
            self.discount_percent.to_string(),
            self.prorate.to_string(),
            self.effective_from.map(|d| d.to_string()).unwrap_or_default(),
            self.effective_until.map(|d| d.to_string()).unwrap_or_default(),
        ]
    }
}

impl NumericCell for PriceCell {
    fn amount(&self) -> i64 {
        self.price
    }

    fn with_amount(&self, amount: i64) -> Self {
        Self {
            price: amount,
            ..self.clone()
        }
    }
}
