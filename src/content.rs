//! Blog post, book catalog, and social-link aggregates plus the draft
//! payloads sent by the admin authoring flow.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    document::{Document, FormattedBlock, SerializedDocument},
    types::{BlogCategory, BlogId, BookId},
};

/// Image file attached to a blog or book draft. Its presence switches
/// the create/update request body from JSON to multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Original file name.
    pub filename: String,
    /// MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// One published blog post as returned by the content API. The body
/// travels as flat `content` plus structured `formattedContent`; the
/// structured form is authoritative for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    /// Identifier/slug.
    pub id: BlogId,
    /// Post title.
    pub title: String,
    /// Author display name.
    pub author: String,
    /// Post category.
    pub category: BlogCategory,
    /// Listing excerpt.
    pub excerpt: String,
    /// Publication date as delivered by the server.
    pub date: String,
    /// Cover image URL, if any.
    #[serde(default)]
    pub image: Option<String>,
    /// Pre-computed read-time label, e.g. `"5 min read"`.
    pub read_time: String,
    /// Free-form tag set.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Legacy flat-text body for plain-text consumers.
    pub content: String,
    /// Structured body blocks, ids stripped.
    #[serde(default)]
    pub formatted_content: Vec<FormattedBlock>,
}

impl BlogPost {
    /// Rebuilds the editable block document from the persisted body.
    /// Block ids are positional; they are a local editing concern.
    pub fn document(&self) -> Document {
        Document::from_serialized(&self.formatted_content)
    }
}

/// One page of the public blog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedBlogs {
    /// Posts on this page.
    pub posts: Vec<BlogPost>,
    /// One-based page index.
    pub page: u32,
    /// Total page count for the active filter.
    pub total_pages: u32,
}

/// Create/update payload for a blog post. The body is always replaced
/// whole; there is no partial-block patch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogDraft {
    /// Post title.
    pub title: String,
    /// Author display name.
    pub author: String,
    /// Post category.
    pub category: BlogCategory,
    /// Listing excerpt.
    pub excerpt: String,
    /// Publication date.
    pub date: String,
    /// Pre-computed read-time label.
    pub read_time: String,
    /// Free-form tag set.
    pub tags: BTreeSet<String>,
    /// Full replacement block document.
    pub body: Document,
    /// Optional cover image; switches the wire body to multipart.
    pub image: Option<ImageAttachment>,
}

impl BlogDraft {
    /// Serializes the block document into its wire form.
    pub fn serialized_body(&self) -> SerializedDocument {
        self.body.serialize()
    }
}

/// One catalog book as returned by the content API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Server-issued identifier.
    pub id: BookId,
    /// Book title.
    pub title: String,
    /// Author display name.
    pub author: String,
    /// Jacket description.
    pub description: String,
    /// List price, if sold directly.
    #[serde(default)]
    pub price: Option<f64>,
    /// Cover image URL, if any.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Third-party checkout URL, if any.
    #[serde(default)]
    pub purchase_link: Option<String>,
}

/// Create payload for a catalog book.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDraft {
    /// Book title.
    pub title: String,
    /// Author display name.
    pub author: String,
    /// Jacket description.
    pub description: String,
    /// List price, if sold directly.
    pub price: Option<f64>,
    /// Third-party checkout URL, if any.
    pub purchase_link: Option<String>,
    /// Optional cover image; switches the wire body to multipart.
    pub image: Option<ImageAttachment>,
}

/// Social media link set, read and replaced whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    /// Facebook profile URL.
    #[serde(default)]
    pub facebook: Option<String>,
    /// Twitter/X profile URL.
    #[serde(default)]
    pub twitter: Option<String>,
    /// Instagram profile URL.
    #[serde(default)]
    pub instagram: Option<String>,
    /// LinkedIn profile URL.
    #[serde(default)]
    pub linkedin: Option<String>,
    /// YouTube channel URL.
    #[serde(default)]
    pub youtube: Option<String>,
}
