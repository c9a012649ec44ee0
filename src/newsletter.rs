//! Newsletter subscriber records, email pre-flight validation, and
//! aggregate statistics.

use serde::{Deserialize, Serialize};

use crate::types::{SubscriberId, SubscriberStatus, ValidationError};

/// One newsletter subscriber as returned by the content API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    /// Server-issued identifier.
    pub id: SubscriberId,
    /// Unique key within the subscriber set.
    pub email: String,
    /// Subscription date as delivered by the server.
    pub date_subscribed: String,
    /// Active/inactive state, flipped only via toggle.
    pub status: SubscriberStatus,
}

/// Aggregate subscriber statistics. Recomputed server-side; `active_rate`
/// arrives pre-formatted as a percentage string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterStats {
    /// Total subscriber count.
    pub total_subscribers: u64,
    /// Count with active status.
    pub active_subscribers: u64,
    /// Count with inactive status.
    pub inactive_subscribers: u64,
    /// Active share formatted as a percentage, e.g. `"66.7%"`.
    pub active_rate: String,
}

impl NewsletterStats {
    /// Local mirror of the server-side aggregate, used by the admin
    /// dashboard between refreshes and by tests. The rate carries one
    /// decimal; an empty set reads `"0.0%"`.
    pub fn compute(subscribers: &[Subscriber]) -> Self {
        let total = subscribers.len() as u64;
        let active = subscribers
            .iter()
            .filter(|s| s.status == SubscriberStatus::Active)
            .count() as u64;
        let inactive = total - active;

        let rate = if total == 0 {
            0.0
        } else {
            active as f64 * 100.0 / total as f64
        };

        Self {
            total_subscribers: total,
            active_subscribers: active,
            inactive_subscribers: inactive,
            active_rate: format!("{rate:.1}%"),
        }
    }
}

/// Client-side email shape check run before the subscribe request is
/// dispatched. Authoritative validation and dedup stay server-side.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEmail(email.to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid()),
    };

    if local.is_empty() || domain.is_empty() {
        return Err(invalid());
    }

    // Domain needs a dot with text on both sides.
    let dotted = domain.split('.').all(|seg| !seg.is_empty()) && domain.contains('.');
    if !dotted {
        return Err(invalid());
    }

    Ok(())
}
