//! Warehouse access for lag queries

pub mod client;

pub use client::{lag_query, RedshiftWarehouse, Warehouse, WarehouseError};
