//! Domain model: balances, audit records, cards and the ports the core depends on.

pub mod card;
pub mod company;
pub mod credit;
pub mod fee;
pub mod financials;
pub mod issuance;
pub mod money;
pub mod partner;
pub mod ports;
pub mod transaction;
pub mod wallet;
pub mod webhook;
