//! Product form validation.
//!
//! Raw form strings are checked before any insert or update: the name must
//! be present, quantity a positive integer, price a positive number.

use serde::Serialize;
use thiserror::Error;

/// User-facing message for every rejected product form.
pub const INVALID_PRODUCT_MESSAGE: &str = "Please enter valid product details.";

/// The form field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Quantity,
    Price,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Quantity => "quantity",
            Self::Price => "price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", INVALID_PRODUCT_MESSAGE)]
pub struct ValidationError {
    pub field: Field,
}

/// Product fields exactly as submitted.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub quantity: String,
    pub price: String,
}

/// A validated product record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

impl ProductInput {
    pub fn validate(&self) -> Result<Product, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError { field: Field::Name });
        }

        let quantity = self
            .quantity
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError {
                field: Field::Quantity,
            })?;

        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or(ValidationError {
                field: Field::Price,
            })?;

        Ok(Product {
            name: name.to_string(),
            quantity,
            price,
        })
    }
}
