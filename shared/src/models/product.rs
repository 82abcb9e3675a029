//! Product Model
//!
//! The inventory collaborator's persisted shape. The checkout core only
//! reads price snapshots and applies atomic signed stock deltas; catalog
//! management is owned elsewhere.

use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    /// Unit price in currency units
    pub price: i64,
    pub stock: i64,
    pub sold: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub category_id: i64,
    pub price: i64,
    pub stock: i64,
}
