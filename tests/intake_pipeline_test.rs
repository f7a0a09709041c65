#[cfg(test)]
mod intake_pipeline_integration_tests {
    use async_trait::async_trait;
    use fmserver::core::config::IntakeConfig;
    use fmserver::core::shared::models::{
        Organization, Profile, ProfileRole, Requester, RequesterStatus, ServiceRequest, Site,
        Tenant,
    };
    use fmserver::core::store::{IntakeStore, MemoryIntakeStore, StoreError};
    use fmserver::intake::title::fallback_title;
    use fmserver::intake::{FallbackRouting, Identity, InboundMessage, IntakeError, IntakePipeline};
    use fmserver::llm::LLMProvider;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    struct StubSummarizer(&'static str);

    #[async_trait]
    impl LLMProvider for StubSummarizer {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &Value,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenSummarizer;

    #[async_trait]
    impl LLMProvider for BrokenSummarizer {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &Value,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Err("RESOURCE_EXHAUSTED".into())
        }
    }

    struct HangingSummarizer;

    #[async_trait]
    impl LLMProvider for HangingSummarizer {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &Value,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    /// Identity reads and/or ticket inserts fail; everything else hits memory.
    struct FaultyStore {
        inner: Arc<MemoryIntakeStore>,
        fail_identity_reads: bool,
        fail_inserts: bool,
    }

    #[async_trait]
    impl IntakeStore for FaultyStore {
        async fn find_profiles_by_phone_suffix(
            &self,
            suffix: &str,
        ) -> Result<Vec<Profile>, StoreError> {
            if self.fail_identity_reads {
                return Err(StoreError::Pool("connection refused".to_string()));
            }
            self.inner.find_profiles_by_phone_suffix(suffix).await
        }

        async fn find_tenants_by_phone_suffix(
            &self,
            suffix: &str,
        ) -> Result<Vec<Tenant>, StoreError> {
            if self.fail_identity_reads {
                return Err(StoreError::Pool("connection refused".to_string()));
            }
            self.inner.find_tenants_by_phone_suffix(suffix).await
        }

        async fn find_requesters_by_phone_suffix(
            &self,
            suffix: &str,
        ) -> Result<Vec<Requester>, StoreError> {
            if self.fail_identity_reads {
                return Err(StoreError::Query("timeout".to_string()));
            }
            self.inner.find_requesters_by_phone_suffix(suffix).await
        }

        async fn latest_organization(&self) -> Result<Option<Organization>, StoreError> {
            self.inner.latest_organization().await
        }

        async fn organization(&self, id: &str) -> Result<Option<Organization>, StoreError> {
            self.inner.organization(id).await
        }

        async fn site_by_code(&self, code: &str) -> Result<Option<Site>, StoreError> {
            self.inner.site_by_code(code).await
        }

        async fn upsert_pending_requester(
            &self,
            phone: &str,
            org_id: &str,
        ) -> Result<Requester, StoreError> {
            self.inner.upsert_pending_requester(phone, org_id).await
        }

        async fn insert_service_request(&self, request: &ServiceRequest) -> Result<(), StoreError> {
            if self.fail_inserts {
                return Err(StoreError::Query(
                    "null value in column \"org_id\" violates not-null constraint".to_string(),
                ));
            }
            self.inner.insert_service_request(request).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn pipeline(store: Arc<dyn IntakeStore>) -> IntakePipeline {
        IntakePipeline::new(store, IntakeConfig::default())
    }

    fn message(from: &str, body: &str) -> InboundMessage {
        InboundMessage {
            from: from.to_string(),
            body: body.to_string(),
        }
    }

    async fn acme_store() -> Arc<MemoryIntakeStore> {
        let store = Arc::new(MemoryIntakeStore::new());
        store.add_organization("org-1", "Acme").await;
        store
    }

    #[tokio::test]
    async fn test_new_sender_creates_pending_requester_and_ticket() {
        let store = acme_store().await;
        let outcome = pipeline(store.clone())
            .process(message("whatsapp:+19175551234", "leaking pipe in unit 4"))
            .await
            .unwrap();

        let requesters = store.requesters().await;
        assert_eq!(requesters.len(), 1);
        assert_eq!(requesters[0].phone, "19175551234");
        assert_eq!(requesters[0].org_id, "org-1");
        assert_eq!(requesters[0].status, "pending");

        let tickets = store.service_requests().await;
        assert_eq!(tickets.len(), 1);
        let ticket = &tickets[0];
        assert_eq!(ticket.org_id, "org-1");
        assert_eq!(ticket.requester_phone, "19175551234");
        assert_eq!(ticket.status, "New");
        assert_eq!(ticket.source, "WhatsApp");
        assert_eq!(ticket.description, "leaking pipe in unit 4");
        assert_eq!(outcome.ticket.as_ref(), Some(ticket));

        assert!(outcome.reply.contains("Acme"));
        assert!(outcome.reply.contains("pending administrator approval"));
        assert!(outcome.reply.contains(&ticket.id));
        assert_eq!(outcome.identity, Identity::Unresolved);
    }

    #[tokio::test]
    async fn test_repeat_sender_gets_second_ticket_but_one_requester() {
        let store = acme_store().await;
        let pipeline = pipeline(store.clone());

        pipeline
            .process(message("whatsapp:+19175551234", "leaking pipe in unit 4"))
            .await
            .unwrap();
        let second = pipeline
            .process(message("whatsapp:+19175551234", "still leaking, water on floor"))
            .await
            .unwrap();

        let requesters = store.requesters().await;
        assert_eq!(requesters.len(), 1);
        assert_eq!(requesters[0].org_id, "org-1");
        assert_eq!(requesters[0].status, "pending");

        let tickets = store.service_requests().await;
        assert_eq!(tickets.len(), 2);
        assert_ne!(tickets[0].id, tickets[1].id);
        assert!(second.reply.contains("still pending administrator approval"));
    }

    #[tokio::test]
    async fn test_tenant_ticket_bound_to_site_and_greeted_by_name() {
        let store = acme_store().await;
        store.add_organization("org-2", "Globex Towers").await;
        store
            .add_tenant("org-2", "site-9", Some("block-a"), "Jane", "+1 (917) 555-1234")
            .await;

        let outcome = pipeline(store.clone())
            .process(message("whatsapp:+19175551234", "no hot water"))
            .await
            .unwrap();

        let ticket = outcome.ticket.unwrap();
        assert_eq!(ticket.org_id, "org-2");
        assert_eq!(ticket.site_id.as_deref(), Some("site-9"));
        assert_eq!(ticket.block_id.as_deref(), Some("block-a"));
        assert_eq!(
            outcome.reply,
            format!(
                "✅ Hello Jane! Ticket {} has been logged to the Globex Towers dashboard.",
                ticket.id
            )
        );
        assert!(store.requesters().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_organization_is_configuration_error() {
        let store = Arc::new(MemoryIntakeStore::new());
        let err = pipeline(store.clone())
            .process(message("whatsapp:+19175551234", "leaking pipe in unit 4"))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::NoOrganization));
        assert!(store.requesters().await.is_empty());
        assert!(store.service_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_summarizer_failure_uses_truncated_title() {
        let body = "The boiler in the basement plant room is making a loud banging noise";
        for provider in [
            Arc::new(BrokenSummarizer) as Arc<dyn LLMProvider>,
            Arc::new(HangingSummarizer) as Arc<dyn LLMProvider>,
        ] {
            let store = acme_store().await;
            let outcome = pipeline(store.clone())
                .with_summarizer(Some(provider), Duration::from_millis(50))
                .process(message("whatsapp:+19175551234", body))
                .await
                .unwrap();

            let ticket = outcome.ticket.unwrap();
            assert_eq!(ticket.title, fallback_title(body));
            assert_eq!(ticket.title.chars().count(), 40);
            assert_eq!(ticket.status, "New");
            assert_eq!(store.service_requests().await.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_summarizer_title_is_cleaned() {
        let store = acme_store().await;
        let outcome = pipeline(store)
            .with_summarizer(
                Some(Arc::new(StubSummarizer("**\"Broken Boiler Noise.\"**"))),
                Duration::from_secs(1),
            )
            .process(message("whatsapp:+19175551234", "boiler making banging noise"))
            .await
            .unwrap();
        assert_eq!(outcome.ticket.unwrap().title, "Broken Boiler Noise");
    }

    #[tokio::test]
    async fn test_tenant_outranks_requester() {
        let store = acme_store().await;
        store.add_organization("org-2", "Globex").await;
        store
            .add_requester("org-1", "19175551234", RequesterStatus::Pending)
            .await
            .unwrap();
        store
            .add_tenant("org-2", "site-9", None, "Jane", "9175551234")
            .await;

        let outcome = pipeline(store)
            .process(message("whatsapp:+19175551234", "door lock jammed"))
            .await
            .unwrap();
        assert_eq!(outcome.ticket.unwrap().org_id, "org-2");
        assert!(matches!(outcome.identity, Identity::Tenant(_)));
    }

    #[tokio::test]
    async fn test_profile_without_name_is_greeted_as_resident() {
        let store = acme_store().await;
        store
            .add_profile("org-1", "", ProfileRole::Tenant, "+919840012345")
            .await;

        let outcome = pipeline(store)
            .process(message("whatsapp:+919840012345", "ceiling fan not working"))
            .await
            .unwrap();
        assert!(outcome.reply.starts_with("✅ Hello Resident! Ticket SR-"));
        assert!(outcome.reply.ends_with("has been logged to the Acme dashboard."));
    }

    #[tokio::test]
    async fn test_approved_requester_gets_plain_acknowledgement() {
        let store = acme_store().await;
        store
            .add_requester("org-1", "19175551234", RequesterStatus::Approved)
            .await
            .unwrap();

        let outcome = pipeline(store)
            .process(message("whatsapp:+19175551234", "window cracked"))
            .await
            .unwrap();
        let ticket = outcome.ticket.unwrap();
        assert_eq!(outcome.reply, format!("✅ Ticket {} logged for Acme.", ticket.id));
    }

    #[tokio::test]
    async fn test_rejected_requester_still_gets_ticket() {
        let store = acme_store().await;
        store
            .add_requester("org-1", "19175551234", RequesterStatus::Rejected)
            .await
            .unwrap();

        let outcome = pipeline(store.clone())
            .process(message("whatsapp:+19175551234", "window cracked"))
            .await
            .unwrap();
        let ticket = outcome.ticket.unwrap();
        assert_eq!(ticket.org_id, "org-1");
        assert!(outcome.reply.contains(&ticket.id));
        assert!(outcome.reply.contains("not approved"));
        assert_eq!(store.service_requests().await, vec![ticket]);
    }

    #[tokio::test]
    async fn test_short_sender_is_not_matched_to_known_contact() {
        let store = acme_store().await;
        store.add_organization("org-2", "Globex").await;
        store
            .add_tenant("org-1", "site-9", None, "Jane", "+1 917 555 1234")
            .await;

        let outcome = pipeline(store.clone())
            .process(message("whatsapp:+1234", "window cracked"))
            .await
            .unwrap();

        assert_eq!(outcome.identity, Identity::Unresolved);
        assert!(!outcome.reply.contains("Jane"));
        let ticket = outcome.ticket.unwrap();
        assert_eq!(ticket.org_id, "org-2");
        assert_eq!(ticket.site_id, None);
        assert!(outcome.reply.starts_with("✅ Welcome! Ticket SR-"));
    }

    #[tokio::test]
    async fn test_identity_read_failure_degrades_to_fallback() {
        let inner = acme_store().await;
        inner
            .add_tenant("org-2", "site-9", None, "Jane", "19175551234")
            .await;
        let store = Arc::new(FaultyStore {
            inner: inner.clone(),
            fail_identity_reads: true,
            fail_inserts: false,
        });

        let outcome = pipeline(store)
            .process(message("whatsapp:+19175551234", "leaking pipe in unit 4"))
            .await
            .unwrap();

        assert_eq!(outcome.identity, Identity::Unresolved);
        assert_eq!(outcome.ticket.unwrap().org_id, "org-1");
        assert_eq!(inner.requesters().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ticket_insert_failure_is_reported() {
        let inner = acme_store().await;
        let store = Arc::new(FaultyStore {
            inner: inner.clone(),
            fail_identity_reads: false,
            fail_inserts: true,
        });

        let err = pipeline(store)
            .process(message("whatsapp:+19175551234", "leaking pipe in unit 4"))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::TicketInsert(_)));
        assert!(!err.sender_message(false).unwrap().contains("not-null"));
        assert!(err.sender_message(true).unwrap().contains("not-null"));
        assert!(inner.service_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_sandbox_join_is_greeted_without_ticket() {
        let store = acme_store().await;
        let outcome = pipeline(store.clone())
            .process(message("whatsapp:+19175551234", "join bright-river"))
            .await
            .unwrap();

        assert!(outcome.ticket.is_none());
        assert!(store.service_requests().await.is_empty());
        assert!(store.requesters().await.is_empty());
    }

    #[tokio::test]
    async fn test_join_prefix_is_stripped_from_description() {
        let store = acme_store().await;
        let outcome = pipeline(store)
            .process(message("whatsapp:+19175551234", "join bright-river lift stuck"))
            .await
            .unwrap();
        assert_eq!(outcome.ticket.unwrap().description, "lift stuck");
    }

    #[tokio::test]
    async fn test_site_code_routing_binds_site() {
        let store = acme_store().await;
        store.add_organization("org-2", "Globex").await;
        store.add_site("site-598", "org-1", "Olympia", "SITE-598").await;

        let config = IntakeConfig {
            fallback_routing: FallbackRouting::SiteCodeOrLatest,
            ..IntakeConfig::default()
        };
        let outcome = IntakePipeline::new(store.clone(), config)
            .process(message("whatsapp:+19175551234", "SITE-598 corridor lights out"))
            .await
            .unwrap();

        let ticket = outcome.ticket.unwrap();
        assert_eq!(ticket.org_id, "org-1");
        assert_eq!(ticket.site_id.as_deref(), Some("site-598"));
        assert!(outcome.reply.contains("Acme"));
    }

    #[tokio::test]
    async fn test_site_code_policy_rejects_message_without_code() {
        let store = acme_store().await;
        let config = IntakeConfig {
            fallback_routing: FallbackRouting::SiteCode,
            ..IntakeConfig::default()
        };
        let err = IntakePipeline::new(store.clone(), config)
            .process(message("whatsapp:+19175551234", "corridor lights out"))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::Unroutable));
        assert!(err.sender_message(false).unwrap().contains("site code"));
        assert!(store.service_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_sender_without_digits_is_rejected() {
        let store = acme_store().await;
        let err = pipeline(store)
            .process(message("whatsapp:", "leaking pipe"))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::MissingField("From")));
    }
}
