use chrono::Utc;
use log::{info, warn};
use rand::Rng;

use super::error::IntakeError;
use crate::core::shared::models::{ServiceRequest, ServiceRequestSource, ServiceRequestStatus};
use crate::core::store::{IntakeStore, StoreError};

pub const TICKET_PREFIX: &str = "SR-";
pub const MAX_ID_ATTEMPTS: usize = 5;
pub const DEFAULT_ORG_NAME: &str = "Facility";
pub const DEFAULT_RESIDENT_NAME: &str = "Resident";

/// Everything the writer needs besides the generated id.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub org_id: String,
    pub site_id: Option<String>,
    pub block_id: Option<String>,
    pub title: String,
    pub description: String,
    pub requester_phone: String,
}

/// How the sender was known, which decides the acknowledgement wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind<'a> {
    Known { name: Option<&'a str> },
    NewContact,
    PendingRequester,
    ApprovedRequester,
    RejectedRequester,
}

pub fn generate_ticket_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    format!("{TICKET_PREFIX}{n}")
}

/// Inserts the ticket, drawing a fresh id when the previous one was taken.
pub async fn write_service_request(
    store: &dyn IntakeStore,
    draft: TicketDraft,
) -> Result<ServiceRequest, IntakeError> {
    let mut ticket = ServiceRequest {
        id: generate_ticket_id(),
        org_id: draft.org_id,
        site_id: draft.site_id,
        block_id: draft.block_id,
        asset_id: None,
        title: draft.title,
        description: draft.description,
        requester_phone: draft.requester_phone,
        status: ServiceRequestStatus::New.as_str().to_string(),
        source: ServiceRequestSource::WhatsApp.as_str().to_string(),
        resolution_notes: None,
        created_at: Utc::now(),
    };

    for attempt in 1..=MAX_ID_ATTEMPTS {
        match store.insert_service_request(&ticket).await {
            Ok(()) => {
                info!(
                    "Created service request {} for org {} from {}",
                    ticket.id, ticket.org_id, ticket.requester_phone
                );
                return Ok(ticket);
            }
            Err(StoreError::Conflict(_)) if attempt < MAX_ID_ATTEMPTS => {
                warn!(
                    "Ticket id {} already taken (attempt {}/{}), retrying",
                    ticket.id, attempt, MAX_ID_ATTEMPTS
                );
                ticket.id = generate_ticket_id();
            }
            Err(e) => return Err(IntakeError::TicketInsert(e)),
        }
    }

    Err(IntakeError::TicketInsert(StoreError::Conflict(format!(
        "no free ticket id after {MAX_ID_ATTEMPTS} attempts"
    ))))
}

pub fn acknowledgement(kind: AckKind<'_>, ticket_id: &str, org_name: &str) -> String {
    match kind {
        AckKind::Known { name } => format!(
            "✅ Hello {}! Ticket {} has been logged to the {} dashboard.",
            name.filter(|n| !n.trim().is_empty())
                .unwrap_or(DEFAULT_RESIDENT_NAME),
            ticket_id,
            org_name
        ),
        AckKind::NewContact => format!(
            "✅ Welcome! Ticket {ticket_id} logged for {org_name}. As you are a new contact, \
             your access is pending administrator approval."
        ),
        AckKind::PendingRequester => format!(
            "✅ Ticket {ticket_id} logged for {org_name}. Note: Your contact is still pending \
             administrator approval."
        ),
        AckKind::ApprovedRequester => format!("✅ Ticket {ticket_id} logged for {org_name}."),
        AckKind::RejectedRequester => format!(
            "⚠️ Ticket {ticket_id} logged for {org_name}. Note: Your contact was not approved, \
             please reach out to the facility office directly."
        ),
    }
}
