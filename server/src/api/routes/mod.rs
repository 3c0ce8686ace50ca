//! API route modules

pub mod cache;
pub mod health;
