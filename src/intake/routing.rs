//! Choosing a host organization for senders no identity table knows.

use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::error::IntakeError;
use super::phone::PhoneNumber;
use crate::core::shared::models::Requester;
use crate::core::store::IntakeStore;

static SITE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSITE-(\d+)\b").expect("Invalid site code regex"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRouting {
    /// Most recently created organization.
    #[default]
    LatestOrganization,
    /// `SITE-<digits>` in the body, resolved through `sites`; nothing else.
    SiteCode,
    SiteCodeOrLatest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRoute {
    pub org_id: String,
    pub site_id: Option<String>,
    /// Stored pending row; `None` when the upsert failed.
    pub requester: Option<Requester>,
}

/// Returns the upper-cased code, e.g. `SITE-598`.
pub fn extract_site_code(body: &str) -> Option<String> {
    SITE_CODE_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|digits| format!("SITE-{}", digits.as_str()))
}

async fn route_by_site_code(
    store: &dyn IntakeStore,
    body: &str,
) -> Result<Option<(String, String)>, IntakeError> {
    let Some(code) = extract_site_code(body) else {
        return Ok(None);
    };
    match store.site_by_code(&code).await? {
        Some(site) => {
            info!("Routing sender through site code {} to org {}", code, site.org_id);
            Ok(Some((site.org_id, site.id)))
        }
        None => {
            warn!("Unknown site code {} in inbound message", code);
            Ok(None)
        }
    }
}

async fn route_to_latest(store: &dyn IntakeStore) -> Result<String, IntakeError> {
    store
        .latest_organization()
        .await?
        .map(|org| org.id)
        .ok_or(IntakeError::NoOrganization)
}

/// Picks the organization and records the sender as a pending requester.
///
/// The upsert returns the stored row; if another message already registered
/// the phone under a different organization, that organization wins and any
/// site binding from this message is dropped.
pub async fn select_fallback(
    store: &dyn IntakeStore,
    policy: FallbackRouting,
    phone: &PhoneNumber,
    body: &str,
) -> Result<FallbackRoute, IntakeError> {
    let (org_id, site_id) = match policy {
        FallbackRouting::LatestOrganization => (route_to_latest(store).await?, None),
        FallbackRouting::SiteCode => match route_by_site_code(store, body).await? {
            Some((org_id, site_id)) => (org_id, Some(site_id)),
            None => return Err(IntakeError::Unroutable),
        },
        FallbackRouting::SiteCodeOrLatest => match route_by_site_code(store, body).await? {
            Some((org_id, site_id)) => (org_id, Some(site_id)),
            None => (route_to_latest(store).await?, None),
        },
    };

    match store
        .upsert_pending_requester(phone.canonical(), &org_id)
        .await
    {
        Ok(requester) if requester.org_id != org_id => {
            info!(
                "Requester {} already registered under org {}, not {}",
                phone, requester.org_id, org_id
            );
            Ok(FallbackRoute {
                org_id: requester.org_id.clone(),
                site_id: None,
                requester: Some(requester),
            })
        }
        Ok(requester) => Ok(FallbackRoute {
            org_id,
            site_id,
            requester: Some(requester),
        }),
        Err(e) => {
            warn!("Failed to record pending requester {}: {}", phone, e);
            Ok(FallbackRoute {
                org_id,
                site_id,
                requester: None,
            })
        }
    }
}
