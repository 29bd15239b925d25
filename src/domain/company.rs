//! Read-only views of the company records owned by the CRUD layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
}

/// Registration details used by underwriting.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CompanyProfile {
    pub company_id: Uuid,
    pub rc_number: String,
    pub incorporation_year: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}
