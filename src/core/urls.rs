#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    // Health
    pub const HEALTH: &'static str = "/health";
    pub const API_HEALTH: &'static str = "/api/health";

    // Inbound messaging webhooks - form-encoded, TwiML replies
    pub const WHATSAPP_WEBHOOK: &'static str = "/webhook/whatsapp";
    pub const LEGACY_WEBHOOK: &'static str = "/api/webhook";
}
