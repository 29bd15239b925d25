//! Application layer orchestrating the spend-management workflows.
//!
//! Every service here owns only `Arc` handles to the domain ports, so they are cheap to
//! clone into concurrent request handlers. Balance mutations are funnelled through
//! [`ledger::WalletLedger`].

pub mod cards;
pub mod credit_increase;
pub mod fees;
pub mod ledger;
pub mod transactions;
pub mod underwriting;
pub mod webhooks;
