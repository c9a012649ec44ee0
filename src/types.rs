//! Shared identifiers, cache tags, and small domain enums.

use serde::{Deserialize, Serialize};

/// Blog post identifier/slug as issued by the content API.
pub type BlogId = String;
/// Book identifier as issued by the content API.
pub type BookId = String;
/// Subscriber identifier as issued by the content API.
pub type SubscriberId = String;
/// Block identifier, unique within one document, stable across reorders.
pub type BlockId = u64;
/// Fetch generation, drawn from a store-wide monotonic counter.
pub type FetchGen = u64;

/// Opaque cache tag linking queries that provide data to mutations that
/// invalidate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Newsletter subscriber list.
    Subscribers,
    /// Newsletter aggregate statistics.
    Stats,
    /// Admin-side blog listing.
    AdminBlogs,
    /// Public blog listings and posts.
    PublicBlogs,
    /// Book catalog.
    Books,
    /// Social media link set.
    SocialMedia,
}

/// Blog post category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogCategory {
    /// Personal finance.
    Finance,
    /// Education.
    Education,
    /// Entrepreneurship.
    Entrepreneurship,
    /// Personal essays.
    Personal,
}

impl BlogCategory {
    /// Wire name used in query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finance => "finance",
            Self::Education => "education",
            Self::Entrepreneurship => "entrepreneurship",
            Self::Personal => "personal",
        }
    }
}

/// Subscription state of one newsletter subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Receives the newsletter.
    Active,
    /// Opted out but retained.
    Inactive,
}

impl SubscriberStatus {
    /// Returns the flipped status. Toggle is the only exposed transition.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

/// Local pre-flight validation failure, rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email fails the client-side shape check.
    InvalidEmail(String),
}

impl ValidationError {
    /// Stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid-email",
        }
    }
}
