use axum::http::StatusCode;

use crate::core::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid request signature")]
    InvalidSignature,
    #[error("Configuration Error: No organizations exist.")]
    NoOrganization,
    #[error("Sender could not be routed to an organization")]
    Unroutable,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Ticket insert failed: {0}")]
    TicketInsert(StoreError),
}

impl IntakeError {
    /// Transport and configuration faults get a bare status; everything else
    /// is answered with a reply message and 200 so the provider delivers it.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::NoOrganization => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unroutable | Self::Store(_) | Self::TicketInsert(_) => StatusCode::OK,
        }
    }

    /// Text for the sender, `None` when the error is answered with a bare status.
    pub fn sender_message(&self, expose_store_errors: bool) -> Option<String> {
        let (message, detail) = match self {
            Self::MissingField(_) | Self::InvalidSignature | Self::NoOrganization => return None,
            Self::Unroutable => {
                return Some(
                    "⚠️ We could not tell which facility you belong to. Please resend your \
                     request including your site code, for example SITE-1234."
                        .to_string(),
                )
            }
            Self::Store(e) => (
                "⚠️ We could not process your request right now. Please try again shortly.",
                e,
            ),
            Self::TicketInsert(e) => (
                "⚠️ Your request could not be logged. Please try again shortly.",
                e,
            ),
        };
        if expose_store_errors {
            Some(format!("{message} (Error: {detail})"))
        } else {
            Some(message.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_have_no_reply() {
        assert_eq!(
            IntakeError::MissingField("Body").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(IntakeError::MissingField("Body").sender_message(true).is_none());
        assert_eq!(
            IntakeError::NoOrganization.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            IntakeError::NoOrganization.to_string(),
            "Configuration Error: No organizations exist."
        );
    }

    #[test]
    fn test_store_detail_only_when_exposed() {
        let err = IntakeError::TicketInsert(StoreError::Query("relation missing".to_string()));
        assert_eq!(err.status_code(), StatusCode::OK);

        let hidden = err.sender_message(false).unwrap();
        assert!(!hidden.contains("relation missing"));

        let shown = err.sender_message(true).unwrap();
        assert!(shown.contains("relation missing"));
    }
}
