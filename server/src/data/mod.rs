//! Data layer

pub mod cache;
