//! The standardized product record every source emits.

use crate::error::ShelfscanError;
use crate::types::SourceName;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Highest price a record may carry; anything above is a parsing accident.
pub const MAX_PRICE_CENTS: u64 = 10_000_000;

/// Exact decimal price held as integer cents.
///
/// Serialized as a JSON number with two-decimal precision so consumers see
/// `19.99`, while arithmetic and comparisons stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    /// Create a price from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    /// Create a price from whole units and a cent remainder (`cents` < 100).
    #[must_use]
    pub fn from_parts(units: u64, cents: u8) -> Option<Self> {
        if cents >= 100 {
            return None;
        }
        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(u64::from(cents)))
            .map(Self::from_cents)
    }

    /// Parse a plain decimal string such as `"12"`, `"12.5"` or `"12.34"`.
    ///
    /// More than two fractional digits are rejected rather than rounded.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (units, fraction) = match text.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (text, ""),
        };

        if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let units: u64 = units.parse().ok()?;
        let cents: u8 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u8>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };
        Self::from_parts(units, cents)
    }

    /// Total value in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.cents
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(de::Error::custom(format!("invalid price: {value}")));
        }
        Ok(Self::from_cents((value * 100.0).round() as u64))
    }
}

/// Product identifiers pulled from a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    /// Universal Product Code (12 or 13 digits)
    pub upc: Option<String>,
    /// Retailer-specific stock keeping unit
    pub sku: Option<String>,
}

/// One scraped listing in the shape every consumer understands.
///
/// A record with no price and `in_stock == false` is valid: it means the
/// availability is unknown, not that scraping failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Listing title
    pub title: String,
    /// Current price, if the listing shows one
    pub price: Option<Price>,
    /// Whether the listing is purchasable
    pub in_stock: bool,
    /// Canonical product link
    pub product_url: String,
    /// Primary image
    pub image_url: Option<String>,
    /// Universal Product Code
    pub upc: Option<String>,
    /// Retailer SKU
    pub sku: Option<String>,
    /// Registry key of the originating source
    pub source: SourceName,
    /// Brand, when shown
    pub brand: Option<String>,
}

impl ProductRecord {
    /// Start a record with the required fields. Stock defaults to `false`.
    #[must_use]
    pub fn new(title: impl Into<String>, product_url: impl Into<String>, source: SourceName) -> Self {
        Self {
            title: title.into(),
            price: None,
            in_stock: false,
            product_url: product_url.into(),
            image_url: None,
            upc: None,
            sku: None,
            source,
            brand: None,
        }
    }

    /// Set the price.
    #[must_use]
    pub fn with_price(mut self, price: Option<Price>) -> Self {
        self.price = price;
        self
    }

    /// Set the stock flag.
    #[must_use]
    pub fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Set the brand.
    #[must_use]
    pub fn with_brand(mut self, brand: Option<String>) -> Self {
        self.brand = brand;
        self
    }

    /// Set UPC and SKU.
    #[must_use]
    pub fn with_identifiers(mut self, identifiers: Identifiers) -> Self {
        self.upc = identifiers.upc;
        self.sku = identifiers.sku;
        self
    }

    /// Check minimum record requirements.
    ///
    /// # Errors
    /// Returns a validation error naming the first offending field.
    pub fn validate(&self) -> Result<(), ShelfscanError> {
        if self.title.trim().is_empty() {
            return Err(ShelfscanError::Validation("title is empty".to_string()));
        }
        if self.product_url.trim().is_empty() {
            return Err(ShelfscanError::Validation("product_url is empty".to_string()));
        }
        if let Some(price) = self.price {
            if price.cents() > MAX_PRICE_CENTS {
                return Err(ShelfscanError::Validation(format!(
                    "price {price} exceeds maximum"
                )));
            }
        }
        Ok(())
    }
}
