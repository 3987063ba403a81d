//! Backends module - Repository analysis and external tool integrations
//!
//! Provides:
//! - ignore_rules: layered default and `.codepressignore` rules
//! - scan: File walking with walkdir
//! - imports: JS/TS import extraction and resolution
//! - deps: Bounded dependency graphs
//! - search: Matcher selection and the in-process scanner
//! - rg: ripgrep integration
//! - doctor: Dependency checking

pub mod deps;
pub mod doctor;
pub mod ignore_rules;
pub mod imports;
pub mod rg;
pub mod scan;
pub mod search;
