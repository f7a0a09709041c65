/// Number of trailing digits compared when matching phones across tables.
pub const SUFFIX_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber {
    canonical: String,
    suffix: String,
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

impl PhoneNumber {
    /// Accepts transport-prefixed identifiers such as `whatsapp:+1 917-555-1234`.
    pub fn parse(raw: &str) -> Self {
        let canonical = digits_only(raw);
        let suffix = canonical[canonical.len().saturating_sub(SUFFIX_LEN)..].to_string();
        Self { canonical, suffix }
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}
