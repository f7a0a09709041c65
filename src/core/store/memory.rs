use super::{IntakeStore, StoreError, MATCH_LIMIT};
use crate::core::shared::models::{
    Organization, Profile, ProfileRole, Requester, RequesterStatus, ServiceRequest, Site, Tenant,
};
use crate::intake::phone::digits_only;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    organizations: Vec<Organization>,
    profiles: Vec<Profile>,
    sites: Vec<Site>,
    tenants: Vec<Tenant>,
    requesters: Vec<Requester>,
    service_requests: Vec<ServiceRequest>,
}

/// In-process store with the same matching and conflict rules as Postgres.
/// Rows keep insertion order, which doubles as creation order.
#[derive(Debug, Default)]
pub struct MemoryIntakeStore {
    tables: RwLock<Tables>,
}

fn phone_matches(stored: &str, suffix: &str) -> bool {
    digits_only(stored).ends_with(suffix)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl MemoryIntakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_organization(&self, id: &str, name: &str) -> Organization {
        let org = Organization {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.organizations.push(org.clone());
        org
    }

    pub async fn add_profile(
        &self,
        org_id: &str,
        full_name: &str,
        role: ProfileRole,
        phone: &str,
    ) -> Profile {
        let profile = Profile {
            id: new_id(),
            org_id: org_id.to_string(),
            full_name: full_name.to_string(),
            role: role.as_str().to_string(),
            phone: phone.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.profiles.push(profile.clone());
        profile
    }

    pub async fn add_site(&self, id: &str, org_id: &str, name: &str, code: &str) -> Site {
        let site = Site {
            id: id.to_string(),
            org_id: org_id.to_string(),
            name: name.to_string(),
            code: code.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.sites.push(site.clone());
        site
    }

    pub async fn add_tenant(
        &self,
        org_id: &str,
        site_id: &str,
        block_id: Option<&str>,
        name: &str,
        phone: &str,
    ) -> Tenant {
        let tenant = Tenant {
            id: new_id(),
            org_id: org_id.to_string(),
            site_id: site_id.to_string(),
            block_id: block_id.map(str::to_string),
            name: name.to_string(),
            phone: phone.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.tenants.push(tenant.clone());
        tenant
    }

    pub async fn add_requester(
        &self,
        org_id: &str,
        phone: &str,
        status: RequesterStatus,
    ) -> Result<Requester, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.requesters.iter().any(|r| r.phone == phone) {
            return Err(StoreError::Conflict(format!(
                "requester with phone {phone} already exists"
            )));
        }
        let requester = Requester {
            id: new_id(),
            org_id: org_id.to_string(),
            phone: phone.to_string(),
            status: status.as_str().to_string(),
            created_at: Utc::now(),
        };
        tables.requesters.push(requester.clone());
        Ok(requester)
    }

    pub async fn requesters(&self) -> Vec<Requester> {
        self.tables.read().await.requesters.clone()
    }

    pub async fn service_requests(&self) -> Vec<ServiceRequest> {
        self.tables.read().await.service_requests.clone()
    }
}

#[async_trait]
impl IntakeStore for MemoryIntakeStore {
    async fn find_profiles_by_phone_suffix(
        &self,
        suffix: &str,
    ) -> Result<Vec<Profile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .filter(|p| phone_matches(&p.phone, suffix))
            .take(MATCH_LIMIT)
            .cloned()
            .collect())
    }

    async fn find_tenants_by_phone_suffix(&self, suffix: &str) -> Result<Vec<Tenant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tenants
            .iter()
            .filter(|t| phone_matches(&t.phone, suffix))
            .take(MATCH_LIMIT)
            .cloned()
            .collect())
    }

    async fn find_requesters_by_phone_suffix(
        &self,
        suffix: &str,
    ) -> Result<Vec<Requester>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .requesters
            .iter()
            .filter(|r| phone_matches(&r.phone, suffix))
            .take(MATCH_LIMIT)
            .cloned()
            .collect())
    }

    async fn latest_organization(&self) -> Result<Option<Organization>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizations
            .iter()
            .enumerate()
            .max_by_key(|(position, org)| (org.created_at, *position))
            .map(|(_, org)| org.clone()))
    }

    async fn organization(&self, id: &str) -> Result<Option<Organization>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn site_by_code(&self, code: &str) -> Result<Option<Site>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sites
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn upsert_pending_requester(
        &self,
        phone: &str,
        org_id: &str,
    ) -> Result<Requester, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.requesters.iter().find(|r| r.phone == phone) {
            return Ok(existing.clone());
        }
        let requester = Requester {
            id: new_id(),
            org_id: org_id.to_string(),
            phone: phone.to_string(),
            status: RequesterStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        };
        tables.requesters.push(requester.clone());
        Ok(requester)
    }

    async fn insert_service_request(&self, request: &ServiceRequest) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.service_requests.iter().any(|sr| sr.id == request.id) {
            return Err(StoreError::Conflict(format!(
                "service request {} already exists",
                request.id
            )));
        }
        tables.service_requests.push(request.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
