//! Builders for test data

mod account;

pub use account::{AccountBuilder, PlacementBuilder};
