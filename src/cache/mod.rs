//! Cache module - in-memory search report cache

pub mod store;
