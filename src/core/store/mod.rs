//! Relational store access for the intake pipeline.
//!
//! The pipeline only talks to [`IntakeStore`]; production runs on
//! [`PgIntakeStore`], tests and the `--memory` mode use [`MemoryIntakeStore`].
//! Phone lookups match on the trailing digits of the stored phone after
//! stripping everything that is not a digit, so records written by the web
//! onboarding (`+1 917-555-1234`) and by the webhook (`19175551234`) agree.

mod memory;
mod postgres;

pub use memory::MemoryIntakeStore;
pub use postgres::PgIntakeStore;

use crate::core::shared::models::{
    Organization, Profile, Requester, ServiceRequest, Site, Tenant,
};
use async_trait::async_trait;

/// Lookups return at most this many rows so ambiguity can be detected.
pub const MATCH_LIMIT: usize = 2;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Pool(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Task error: {0}")]
    Task(String),
}

#[async_trait]
pub trait IntakeStore: Send + Sync {
    /// Profiles whose phone ends with `suffix`, oldest first.
    async fn find_profiles_by_phone_suffix(&self, suffix: &str)
        -> Result<Vec<Profile>, StoreError>;

    /// Tenants whose phone ends with `suffix`, oldest first.
    async fn find_tenants_by_phone_suffix(&self, suffix: &str) -> Result<Vec<Tenant>, StoreError>;

    /// Requesters whose phone ends with `suffix`, oldest first.
    async fn find_requesters_by_phone_suffix(
        &self,
        suffix: &str,
    ) -> Result<Vec<Requester>, StoreError>;

    async fn latest_organization(&self) -> Result<Option<Organization>, StoreError>;

    async fn organization(&self, id: &str) -> Result<Option<Organization>, StoreError>;

    /// Case-insensitive exact match on the site code.
    async fn site_by_code(&self, code: &str) -> Result<Option<Site>, StoreError>;

    /// Inserts a pending requester unless one already exists for `phone`, and
    /// returns the stored row either way.
    async fn upsert_pending_requester(
        &self,
        phone: &str,
        org_id: &str,
    ) -> Result<Requester, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the id is already taken.
    async fn insert_service_request(&self, request: &ServiceRequest) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
