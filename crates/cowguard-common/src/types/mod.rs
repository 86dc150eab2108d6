//! Core domain types for the CowGuard engine

pub mod claim;
pub mod policy;
pub mod pool_account;
pub mod product;
pub mod risk;
