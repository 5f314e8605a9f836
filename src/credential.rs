use std::fmt;

/// An opaque bearer token for one upstream service.
///
/// Absence is modelled as `Option<Credential>` at every provider boundary;
/// a `Credential` value is never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, returning `None` for empty or whitespace-only input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Map a stored, possibly-missing token to a credential.
    pub fn from_option(token: Option<&str>) -> Option<Self> {
        token.and_then(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Tokens must never reach the logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}
