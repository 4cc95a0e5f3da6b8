//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into ledger and catalog APIs.
//! - Keep callers decoupled from storage details.

pub mod allocation;
pub mod catalog_service;
pub mod error;
pub mod ledger_service;
