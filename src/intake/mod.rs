//! Inbound maintenance-request intake.
//!
//! One message runs strictly in order: normalize the sender phone, resolve
//! who they are, route unknown senders to a fallback organization, summarize
//! a title, write the ticket and build the acknowledgement.

pub mod error;
pub mod identity;
pub mod phone;
pub mod routing;
pub mod title;
pub mod writer;

pub use error::IntakeError;
pub use identity::{resolve_identity, Identity};
pub use phone::PhoneNumber;
pub use routing::{FallbackRoute, FallbackRouting};

use log::{info, warn};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::core::config::IntakeConfig;
use crate::core::shared::models::{RequesterStatus, ServiceRequest};
use crate::core::store::IntakeStore;
use crate::llm::LLMProvider;
use writer::{AckKind, TicketDraft, DEFAULT_ORG_NAME};

/// Messaging-sandbox opt-in, e.g. `join bright-river`.
static JOIN_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*join\s+[a-z]+(?:-[a-z]+)+\s*").expect("Invalid join keyword regex")
});

pub const JOIN_GREETING: &str = "👋 You're connected! Describe your maintenance issue in a \
                                 message and we'll log a ticket for you.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Raw sender identifier, e.g. `whatsapp:+19175551234`.
    pub from: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeOutcome {
    pub reply: String,
    /// `None` only for sandbox joins.
    pub ticket: Option<ServiceRequest>,
    pub identity: Identity,
}

pub fn clean_body(body: &str) -> String {
    JOIN_KEYWORD_RE.replace(body, "").trim().to_string()
}

#[derive(Clone)]
pub struct IntakePipeline {
    store: Arc<dyn IntakeStore>,
    config: IntakeConfig,
    summarizer: Option<Arc<dyn LLMProvider>>,
    summary_timeout: Duration,
}

impl std::fmt::Debug for IntakePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakePipeline")
            .field("config", &self.config)
            .field("summarizer", &self.summarizer.is_some())
            .field("summary_timeout", &self.summary_timeout)
            .finish_non_exhaustive()
    }
}

/// Where the ticket goes and how the sender is greeted.
struct Placement {
    org_id: String,
    site_id: Option<String>,
    block_id: Option<String>,
    requester_status: Option<RequesterStatus>,
    newly_routed: bool,
}

impl IntakePipeline {
    pub fn new(store: Arc<dyn IntakeStore>, config: IntakeConfig) -> Self {
        Self {
            store,
            config,
            summarizer: None,
            summary_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_summarizer(
        mut self,
        summarizer: Option<Arc<dyn LLMProvider>>,
        timeout: Duration,
    ) -> Self {
        self.summarizer = summarizer;
        self.summary_timeout = timeout;
        self
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    async fn organization_name(&self, org_id: &str) -> String {
        match self.store.organization(org_id).await {
            Ok(Some(org)) => org.name,
            Ok(None) => DEFAULT_ORG_NAME.to_string(),
            Err(e) => {
                warn!("Organization lookup failed for {}: {}", org_id, e);
                DEFAULT_ORG_NAME.to_string()
            }
        }
    }

    async fn place(
        &self,
        identity: &Identity,
        phone: &PhoneNumber,
        body: &str,
    ) -> Result<Placement, IntakeError> {
        if let Some(org_id) = identity.org_id() {
            return Ok(Placement {
                org_id: org_id.to_string(),
                site_id: identity.site_id().map(str::to_string),
                block_id: identity.block_id().map(str::to_string),
                requester_status: identity.requester_status(),
                newly_routed: false,
            });
        }

        let route = routing::select_fallback(
            self.store.as_ref(),
            self.config.fallback_routing,
            phone,
            body,
        )
        .await?;
        let requester_status = route
            .requester
            .as_ref()
            .map(|r| RequesterStatus::parse(&r.status).unwrap_or(RequesterStatus::Pending));
        Ok(Placement {
            org_id: route.org_id,
            site_id: route.site_id,
            block_id: None,
            requester_status,
            newly_routed: true,
        })
    }

    pub async fn process(&self, message: InboundMessage) -> Result<IntakeOutcome, IntakeError> {
        let phone = PhoneNumber::parse(&message.from);
        if phone.is_empty() {
            return Err(IntakeError::MissingField("From"));
        }
        if message.body.trim().is_empty() {
            return Err(IntakeError::MissingField("Body"));
        }

        let body = clean_body(&message.body);
        if body.is_empty() {
            info!("Sandbox join from {}", phone);
            return Ok(IntakeOutcome {
                reply: JOIN_GREETING.to_string(),
                ticket: None,
                identity: Identity::Unresolved,
            });
        }

        let identity = resolve_identity(self.store.as_ref(), phone.suffix()).await;
        info!("Inbound message from {} resolved as {}", phone, identity.kind());

        let placement = self.place(&identity, &phone, &body).await?;
        let org_name = self.organization_name(&placement.org_id).await;

        let title =
            title::summarize_title(self.summarizer.as_deref(), &body, self.summary_timeout).await;

        let ticket = writer::write_service_request(
            self.store.as_ref(),
            TicketDraft {
                org_id: placement.org_id,
                site_id: placement.site_id,
                block_id: placement.block_id,
                title,
                description: body,
                requester_phone: phone.canonical().to_string(),
            },
        )
        .await?;

        let ack = match (placement.newly_routed, placement.requester_status) {
            (_, Some(RequesterStatus::Approved)) => AckKind::ApprovedRequester,
            (_, Some(RequesterStatus::Rejected)) => {
                info!("Ticket {} logged from rejected contact {}", ticket.id, phone);
                AckKind::RejectedRequester
            }
            (true, _) => AckKind::NewContact,
            (false, Some(_)) => AckKind::PendingRequester,
            (false, None) => AckKind::Known {
                name: identity.display_name(),
            },
        };
        let reply = writer::acknowledgement(ack, &ticket.id, &org_name);

        Ok(IntakeOutcome {
            reply,
            ticket: Some(ticket),
            identity,
        })
    }
}
