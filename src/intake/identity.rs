use log::{debug, warn};

use crate::core::shared::models::{Profile, Requester, RequesterStatus, Tenant};
use super::phone::SUFFIX_LEN;
use crate::core::store::{IntakeStore, StoreError};

/// Who a sender is, decided by the first identity table that knows the phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Profile(Profile),
    Tenant(Tenant),
    Requester(Requester),
    Unresolved,
}

impl Identity {
    pub fn org_id(&self) -> Option<&str> {
        match self {
            Self::Profile(p) => Some(&p.org_id),
            Self::Tenant(t) => Some(&t.org_id),
            Self::Requester(r) => Some(&r.org_id),
            Self::Unresolved => None,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Profile(p) => Some(&p.full_name),
            Self::Tenant(t) => Some(&t.name),
            Self::Requester(_) | Self::Unresolved => None,
        }
    }

    pub fn site_id(&self) -> Option<&str> {
        match self {
            Self::Tenant(t) => Some(&t.site_id),
            _ => None,
        }
    }

    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Tenant(t) => t.block_id.as_deref(),
            _ => None,
        }
    }

    /// Unknown stored values are treated as pending.
    pub fn requester_status(&self) -> Option<RequesterStatus> {
        match self {
            Self::Requester(r) => {
                Some(RequesterStatus::parse(&r.status).unwrap_or(RequesterStatus::Pending))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Profile(_) => "profile",
            Self::Tenant(_) => "tenant",
            Self::Requester(_) => "requester",
            Self::Unresolved => "unresolved",
        }
    }
}

/// Returns the first row, or `None` on an empty result or a store error.
fn first_match<T>(table: &str, suffix: &str, result: Result<Vec<T>, StoreError>) -> Option<T> {
    match result {
        Ok(rows) => {
            if rows.len() > 1 {
                warn!(
                    "Phone suffix {} matches several {} rows, using the oldest",
                    suffix, table
                );
            }
            rows.into_iter().next()
        }
        Err(e) => {
            warn!("{} lookup failed for suffix {}: {}", table, suffix, e);
            None
        }
    }
}

/// Suffixes shorter than `SUFFIX_LEN` would trail-match unrelated numbers and
/// are never looked up.
pub async fn resolve_identity(store: &dyn IntakeStore, suffix: &str) -> Identity {
    if suffix.len() < SUFFIX_LEN {
        debug!("Sender {} is too short to match a known contact", suffix);
        return Identity::Unresolved;
    }

    if let Some(profile) = first_match(
        "profiles",
        suffix,
        store.find_profiles_by_phone_suffix(suffix).await,
    ) {
        debug!("Sender {} resolved to profile {}", suffix, profile.id);
        return Identity::Profile(profile);
    }

    if let Some(tenant) = first_match(
        "tenants",
        suffix,
        store.find_tenants_by_phone_suffix(suffix).await,
    ) {
        debug!("Sender {} resolved to tenant {}", suffix, tenant.id);
        return Identity::Tenant(tenant);
    }

    if let Some(requester) = first_match(
        "requesters",
        suffix,
        store.find_requesters_by_phone_suffix(suffix).await,
    ) {
        debug!("Sender {} resolved to requester {}", suffix, requester.id);
        return Identity::Requester(requester);
    }

    Identity::Unresolved
}
