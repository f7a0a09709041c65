use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::shared::schema::{
    organizations, profiles, requesters, service_requests, sites, tenants,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = organizations)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: String,
    pub org_id: String,
    pub full_name: String,
    pub role: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = sites)]
pub struct Site {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = tenants)]
pub struct Tenant {
    pub id: String,
    pub org_id: String,
    pub site_id: String,
    pub block_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = requesters)]
pub struct Requester {
    pub id: String,
    pub org_id: String,
    pub phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Row shape for the pending-requester upsert; `id` comes from the column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = requesters)]
pub struct NewRequester {
    pub org_id: String,
    pub phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = service_requests)]
pub struct ServiceRequest {
    pub id: String,
    pub org_id: String,
    pub site_id: Option<String>,
    pub block_id: Option<String>,
    pub asset_id: Option<String>,
    pub title: String,
    pub description: String,
    pub requester_phone: String,
    pub status: String,
    pub source: String,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceRequestStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl ServiceRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceRequestSource {
    WhatsApp,
    Web,
}

impl ServiceRequestSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhatsApp => "WhatsApp",
            Self::Web => "Web",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequesterStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequesterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Admin,
    Tenant,
}

impl ProfileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Tenant => "tenant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "tenant" => Some(Self::Tenant),
            _ => None,
        }
    }
}
