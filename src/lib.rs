//! Corporate spend-management core: a per-company credit wallet, card issuance that
//! charges it, partner webhooks that authorize and settle card spend, and underwriting that
//! sets the credit ceiling.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;
