use super::{IntakeStore, StoreError, MATCH_LIMIT};
use crate::core::shared::models::{
    NewRequester, Organization, Profile, Requester, RequesterStatus, ServiceRequest, Site, Tenant,
};
use crate::core::shared::schema::{
    organizations, profiles, requesters, service_requests, sites, tenants,
};
use crate::core::shared::utils::DbPool;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Text;

diesel::define_sql_function! {
    fn regexp_replace(source: Text, pattern: Text, replacement: Text, flags: Text) -> Text;
}

impl From<DieselError> for StoreError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

fn suffix_pattern(suffix: &str) -> String {
    format!("%{suffix}")
}

#[derive(Clone)]
pub struct PgIntakeStore {
    pool: DbPool,
}

impl PgIntakeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| StoreError::Pool(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl IntakeStore for PgIntakeStore {
    async fn find_profiles_by_phone_suffix(
        &self,
        suffix: &str,
    ) -> Result<Vec<Profile>, StoreError> {
        let pattern = suffix_pattern(suffix);
        self.run(move |conn| {
            profiles::table
                .filter(regexp_replace(profiles::phone, "[^0-9]", "", "g").like(pattern))
                .order((profiles::created_at.asc(), profiles::id.asc()))
                .limit(MATCH_LIMIT as i64)
                .select(Profile::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_tenants_by_phone_suffix(&self, suffix: &str) -> Result<Vec<Tenant>, StoreError> {
        let pattern = suffix_pattern(suffix);
        self.run(move |conn| {
            tenants::table
                .filter(regexp_replace(tenants::phone, "[^0-9]", "", "g").like(pattern))
                .order((tenants::created_at.asc(), tenants::id.asc()))
                .limit(MATCH_LIMIT as i64)
                .select(Tenant::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_requesters_by_phone_suffix(
        &self,
        suffix: &str,
    ) -> Result<Vec<Requester>, StoreError> {
        let pattern = suffix_pattern(suffix);
        self.run(move |conn| {
            requesters::table
                .filter(regexp_replace(requesters::phone, "[^0-9]", "", "g").like(pattern))
                .order((requesters::created_at.asc(), requesters::id.asc()))
                .limit(MATCH_LIMIT as i64)
                .select(Requester::as_select())
                .load(conn)
                .map_err(StoreError::from)
        })
        .await
    }

    async fn latest_organization(&self) -> Result<Option<Organization>, StoreError> {
        self.run(|conn| {
            organizations::table
                .order((organizations::created_at.desc(), organizations::id.desc()))
                .select(Organization::as_select())
                .first(conn)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn organization(&self, id: &str) -> Result<Option<Organization>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            organizations::table
                .find(id)
                .select(Organization::as_select())
                .first(conn)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn site_by_code(&self, code: &str) -> Result<Option<Site>, StoreError> {
        let code = code.to_string();
        self.run(move |conn| {
            sites::table
                .filter(sites::code.ilike(code))
                .order(sites::created_at.asc())
                .select(Site::as_select())
                .first(conn)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn upsert_pending_requester(
        &self,
        phone: &str,
        org_id: &str,
    ) -> Result<Requester, StoreError> {
        let new_requester = NewRequester {
            org_id: org_id.to_string(),
            phone: phone.to_string(),
            status: RequesterStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            conn.transaction::<Requester, DieselError, _>(|conn| {
                diesel::insert_into(requesters::table)
                    .values(&new_requester)
                    .on_conflict(requesters::phone)
                    .do_nothing()
                    .execute(conn)?;

                requesters::table
                    .filter(requesters::phone.eq(&new_requester.phone))
                    .select(Requester::as_select())
                    .first(conn)
            })
            .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_service_request(&self, request: &ServiceRequest) -> Result<(), StoreError> {
        let row = request.clone();
        self.run(move |conn| {
            diesel::insert_into(service_requests::table)
                .values(&row)
                .execute(conn)
                .map(|_| ())
                .map_err(StoreError::from)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1")
                .execute(conn)
                .map(|_| ())
                .map_err(StoreError::from)
        })
        .await
    }
}
