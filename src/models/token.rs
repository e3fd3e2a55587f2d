//! Action token model: single-use credentials for technician links.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The one transition an action token authorizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    /// Proves arrival at the service location.
    OnSite,
    /// Submits resolution proof.
    Resolution,
}

impl TokenAction {
    /// Stable string form used in the store and in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnSite => "on_site",
            Self::Resolution => "resolution",
        }
    }

    /// Parse the stable string form back into a token action.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_site" => Some(Self::OnSite),
            "resolution" => Some(Self::Resolution),
            _ => None,
        }
    }
}

/// A single-use, time-bound credential authorizing one status transition
/// without staff authentication.
///
/// The `id` is the token value itself and is the sole authorization
/// factor, so it carries 256 bits of randomness. Tokens are never
/// deleted; redeemed and expired rows are retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ActionToken {
    /// The unguessable token value (64 hex characters).
    pub id: String,
    /// Owning ticket identifier.
    pub ticket_id: String,
    /// Field executive the token was issued to.
    pub fe_id: String,
    /// The transition this token authorizes.
    pub action: TokenAction,
    /// Wall-clock expiry; not pause-aware, unlike SLA deadlines.
    pub expires_at: DateTime<Utc>,
    /// Whether the token has been redeemed.
    pub used: bool,
    /// Redemption timestamp.
    pub used_at: Option<DateTime<Utc>>,
    /// Proof photo URL captured at redemption, if any.
    pub proof_url: Option<String>,
    /// Issuance timestamp.
    pub created_at: DateTime<Utc>,
}

impl ActionToken {
    /// Construct a fresh unused token expiring `ttl_hours` from `now`.
    #[must_use]
    pub fn new(
        ticket_id: String,
        fe_id: String,
        action: TokenAction,
        ttl_hours: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_token_value(),
            ticket_id,
            fe_id,
            action,
            expires_at: now + Duration::hours(i64::from(ttl_hours)),
            used: false,
            used_at: None,
            proof_url: None,
            created_at: now,
        }
    }

    /// Whether the token is live: unused and unexpired at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Generate a 256-bit random token value, hex encoded.
#[must_use]
pub fn generate_token_value() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}
