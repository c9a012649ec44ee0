//! Declarative registry of remote operations: one tagged variant per
//! endpoint with a pure mapping to an HTTP request descriptor, plus the
//! tag sets that drive cache invalidation.

use serde_json::{Value, json};

use crate::{
    content::{BlogDraft, BookDraft, ImageAttachment, SocialLinks},
    types::{BlogCategory, BlogId, BookId, SubscriberId, Tag},
};

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PATCH.
    Patch,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

/// Whether an endpoint reads (cached) or writes (invalidates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Cached read with provided tags.
    Query,
    /// Write whose success marks tags stale.
    Mutation,
}

/// One field of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

/// Value of one multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain text field.
    Text(String),
    /// File upload field.
    File(ImageAttachment),
}

/// Request body encoding. JSON by default; create/update mutations with
/// an attached image switch to multipart.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    None,
    /// JSON body.
    Json(Value),
    /// Multipart form body.
    Multipart(Vec<FormPart>),
}

/// Fully described HTTP request, produced by [`Endpoint::request`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the API base URL.
    pub path: String,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// Body encoding.
    pub body: RequestBody,
    /// True when the request carries `Authorization: Bearer <token>`.
    pub requires_auth: bool,
}

/// Cache entry key: endpoint name plus canonically serialized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Endpoint name from the registry table.
    pub endpoint: &'static str,
    /// Canonical JSON of the endpoint arguments.
    pub args: String,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

/// Registered remote operation against the content API. Variants carry
/// their typed arguments; [`Endpoint::request`] is a pure mapping from
/// those arguments to a request descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Public newsletter sign-up.
    SubscribeNewsletter {
        /// Address to subscribe.
        email: String,
    },
    /// Admin subscriber listing.
    GetSubscribers,
    /// Flip one subscriber between active and inactive.
    ToggleSubscriberStatus {
        /// Subscriber to toggle.
        id: SubscriberId,
    },
    /// Bulk-remove subscribers by id. An empty list is an accepted no-op.
    DeleteSubscribers {
        /// Subscribers to remove.
        ids: Vec<SubscriberId>,
    },
    /// Admin newsletter statistics.
    GetNewsletterStats,
    /// Admin blog listing.
    GetAdminBlogs,
    /// Public paged blog listing with optional category filter.
    GetPublicBlogs {
        /// One-based page index.
        page: u32,
        /// Page size.
        limit: u32,
        /// Optional category filter.
        category: Option<BlogCategory>,
    },
    /// Public single blog post.
    GetPublicBlogPost {
        /// Post identifier/slug.
        id: BlogId,
    },
    /// Admin blog creation.
    CreateBlog {
        /// Post payload.
        draft: BlogDraft,
    },
    /// Admin blog update. The block sequence is replaced whole.
    UpdateBlog {
        /// Post identifier/slug.
        id: BlogId,
        /// Replacement payload.
        draft: BlogDraft,
    },
    /// Admin blog deletion.
    DeleteBlogPost {
        /// Post identifier/slug.
        id: BlogId,
    },
    /// Admin book creation.
    CreateBook {
        /// Book payload.
        draft: BookDraft,
    },
    /// Admin book listing.
    GetAdminBooks,
    /// Public book catalog.
    GetPublicBooks,
    /// Public single book.
    GetBookById {
        /// Book identifier.
        id: BookId,
    },
    /// Social media link set.
    GetSocialMedia,
    /// Replace the social media link set.
    UpdateSocialMedia {
        /// Replacement links.
        links: SocialLinks,
    },
}

impl Endpoint {
    /// Operation name from the registry table.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubscribeNewsletter { .. } => "subscribeNewsletter",
            Self::GetSubscribers => "getSubscribers",
            Self::ToggleSubscriberStatus { .. } => "toggleSubscriberStatus",
            Self::DeleteSubscribers { .. } => "deleteSubscribers",
            Self::GetNewsletterStats => "getNewsletterStats",
            Self::GetAdminBlogs => "getAdminBlogs",
            Self::GetPublicBlogs { .. } => "getPublicBlogs",
            Self::GetPublicBlogPost { .. } => "getPublicBlogPost",
            Self::CreateBlog { .. } => "createBlog",
            Self::UpdateBlog { .. } => "updateBlog",
            Self::DeleteBlogPost { .. } => "deleteBlogPost",
            Self::CreateBook { .. } => "createBook",
            Self::GetAdminBooks => "getAdminBooks",
            Self::GetPublicBooks => "getPublicBooks",
            Self::GetBookById { .. } => "getBookById",
            Self::GetSocialMedia => "getSocialMedia",
            Self::UpdateSocialMedia { .. } => "updateSocialMedia",
        }
    }

    /// Query or mutation.
    pub fn kind(&self) -> EndpointKind {
        match self {
            Self::GetSubscribers
            | Self::GetNewsletterStats
            | Self::GetAdminBlogs
            | Self::GetPublicBlogs { .. }
            | Self::GetPublicBlogPost { .. }
            | Self::GetAdminBooks
            | Self::GetPublicBooks
            | Self::GetBookById { .. }
            | Self::GetSocialMedia => EndpointKind::Query,
            _ => EndpointKind::Mutation,
        }
    }

    /// Tags this query provides. Empty for mutations and untagged queries.
    pub fn provides(&self) -> &'static [Tag] {
        match self {
            Self::GetSubscribers => &[Tag::Subscribers],
            Self::GetNewsletterStats => &[Tag::Stats],
            Self::GetAdminBlogs => &[Tag::AdminBlogs],
            Self::GetPublicBooks => &[Tag::Books],
            Self::GetSocialMedia => &[Tag::SocialMedia],
            _ => &[],
        }
    }

    /// Tags this mutation marks stale on success. Empty for queries and
    /// for subscribeNewsletter, which by design does not touch the
    /// admin-side Subscribers entries.
    pub fn invalidates(&self) -> &'static [Tag] {
        match self {
            Self::ToggleSubscriberStatus { .. } | Self::DeleteSubscribers { .. } => {
                &[Tag::Subscribers]
            }
            Self::CreateBlog { .. } | Self::UpdateBlog { .. } | Self::DeleteBlogPost { .. } => {
                &[Tag::AdminBlogs, Tag::PublicBlogs]
            }
            Self::CreateBook { .. } => &[Tag::Books],
            Self::UpdateSocialMedia { .. } => &[Tag::SocialMedia],
            _ => &[],
        }
    }

    /// True for the admin surface, which carries a bearer token.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::GetSubscribers
                | Self::ToggleSubscriberStatus { .. }
                | Self::DeleteSubscribers { .. }
                | Self::GetNewsletterStats
                | Self::GetAdminBlogs
                | Self::CreateBlog { .. }
                | Self::UpdateBlog { .. }
                | Self::DeleteBlogPost { .. }
                | Self::CreateBook { .. }
                | Self::GetAdminBooks
                | Self::UpdateSocialMedia { .. }
        )
    }

    /// Cache key for this endpoint's arguments. One cache entry exists
    /// per distinct key.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            endpoint: self.name(),
            args: self.args_key(),
        }
    }

    /// Pure mapping from typed arguments to an HTTP request descriptor.
    pub fn request(&self) -> RequestDescriptor {
        let (method, path, query, body) = match self {
            Self::SubscribeNewsletter { email } => (
                HttpMethod::Post,
                "/newsletter/subscribe".to_string(),
                vec![],
                RequestBody::Json(json!({ "email": email })),
            ),
            Self::GetSubscribers => (
                HttpMethod::Get,
                "/newsletter/subscribers".to_string(),
                vec![],
                RequestBody::None,
            ),
            Self::ToggleSubscriberStatus { id } => (
                HttpMethod::Patch,
                format!("/newsletter/subscribers/{id}/toggle-status"),
                vec![],
                RequestBody::None,
            ),
            Self::DeleteSubscribers { ids } => (
                HttpMethod::Delete,
                "/newsletter/subscribers".to_string(),
                vec![],
                RequestBody::Json(json!({ "ids": ids })),
            ),
            Self::GetNewsletterStats => (
                HttpMethod::Get,
                "/newsletter/stats".to_string(),
                vec![],
                RequestBody::None,
            ),
            Self::GetAdminBlogs => (
                HttpMethod::Get,
                "/blogs/admin".to_string(),
                vec![],
                RequestBody::None,
            ),
            Self::GetPublicBlogs {
                page,
                limit,
                category,
            } => {
                let mut query = vec![
                    ("page".to_string(), page.to_string()),
                    ("limit".to_string(), limit.to_string()),
                ];
                if let Some(category) = category {
                    query.push(("category".to_string(), category.as_str().to_string()));
                }
                (
                    HttpMethod::Get,
                    "/blogs/public".to_string(),
                    query,
                    RequestBody::None,
                )
            }
            Self::GetPublicBlogPost { id } => (
                HttpMethod::Get,
                format!("/blogs/public/{id}"),
                vec![],
                RequestBody::None,
            ),
            Self::CreateBlog { draft } => (
                HttpMethod::Post,
                "/blogs".to_string(),
                vec![],
                blog_body(draft),
            ),
            Self::UpdateBlog { id, draft } => (
                HttpMethod::Patch,
                format!("/blogs/{id}"),
                vec![],
                blog_body(draft),
            ),
            Self::DeleteBlogPost { id } => (
                HttpMethod::Delete,
                format!("/blogs/{id}"),
                vec![],
                RequestBody::None,
            ),
            Self::CreateBook { draft } => (
                HttpMethod::Post,
                "/books".to_string(),
                vec![],
                book_body(draft),
            ),
            Self::GetAdminBooks => (
                HttpMethod::Get,
                "/books/admin".to_string(),
                vec![],
                RequestBody::None,
            ),
            Self::GetPublicBooks => (
                HttpMethod::Get,
                "/books".to_string(),
                vec![],
                RequestBody::None,
            ),
            Self::GetBookById { id } => (
                HttpMethod::Get,
                format!("/books/{id}"),
                vec![],
                RequestBody::None,
            ),
            Self::GetSocialMedia => (
                HttpMethod::Get,
                "/admin/social-media".to_string(),
                vec![],
                RequestBody::None,
            ),
            Self::UpdateSocialMedia { links } => (
                HttpMethod::Put,
                "/admin/social-media".to_string(),
                vec![],
                RequestBody::Json(json!(links)),
            ),
        };

        RequestDescriptor {
            method,
            path,
            query,
            body,
            requires_auth: self.requires_auth(),
        }
    }

    fn args_key(&self) -> String {
        match self {
            Self::GetPublicBlogs {
                page,
                limit,
                category,
            } => json!([page, limit, category]).to_string(),
            Self::GetPublicBlogPost { id } => json!([id]).to_string(),
            Self::GetBookById { id } => json!([id]).to_string(),
            // Remaining queries are argument-free; mutations are never
            // cached so their key never leaves the runtime.
            _ => "[]".to_string(),
        }
    }
}

fn blog_body(draft: &BlogDraft) -> RequestBody {
    let body = draft.serialized_body();

    match &draft.image {
        Some(image) => RequestBody::Multipart(vec![
            text_part("title", &draft.title),
            text_part("author", &draft.author),
            text_part("category", draft.category.as_str()),
            text_part("excerpt", &draft.excerpt),
            text_part("date", &draft.date),
            text_part("readTime", &draft.read_time),
            text_part("tags", json!(draft.tags).to_string()),
            text_part("content", &body.content),
            text_part("formattedContent", json!(body.formatted_content).to_string()),
            FormPart {
                name: "image".to_string(),
                value: FormValue::File(image.clone()),
            },
        ]),
        None => RequestBody::Json(json!({
            "title": draft.title,
            "author": draft.author,
            "category": draft.category,
            "excerpt": draft.excerpt,
            "date": draft.date,
            "readTime": draft.read_time,
            "tags": draft.tags,
            "content": body.content,
            "formattedContent": body.formatted_content,
        })),
    }
}

fn book_body(draft: &BookDraft) -> RequestBody {
    match &draft.image {
        Some(image) => {
            let mut parts = vec![
                text_part("title", &draft.title),
                text_part("author", &draft.author),
                text_part("description", &draft.description),
            ];
            if let Some(price) = draft.price {
                parts.push(text_part("price", price.to_string()));
            }
            if let Some(link) = &draft.purchase_link {
                parts.push(text_part("purchaseLink", link));
            }
            parts.push(FormPart {
                name: "image".to_string(),
                value: FormValue::File(image.clone()),
            });
            RequestBody::Multipart(parts)
        }
        None => RequestBody::Json(json!({
            "title": draft.title,
            "author": draft.author,
            "description": draft.description,
            "price": draft.price,
            "purchaseLink": draft.purchase_link,
        })),
    }
}

fn text_part(name: &str, value: impl Into<String>) -> FormPart {
    FormPart {
        name: name.to_string(),
        value: FormValue::Text(value.into()),
    }
}

/// Tags provided by at least one registered query.
const PROVIDED_TAGS: &[Tag] = &[
    Tag::Subscribers,
    Tag::Stats,
    Tag::AdminBlogs,
    Tag::Books,
    Tag::SocialMedia,
];

/// Tags invalidated by at least one registered mutation.
const INVALIDATED_TAGS: &[Tag] = &[
    Tag::Subscribers,
    Tag::AdminBlogs,
    Tag::PublicBlogs,
    Tag::Books,
    Tag::SocialMedia,
];

/// Invalidated tags no registered query provides. Invalidating such a
/// tag has no observable effect; the current table knowingly leaves
/// PublicBlogs dangling because the public listings opt out of caching
/// tags. Diagnostic only, nothing is enforced.
pub fn dangling_invalidations() -> Vec<Tag> {
    INVALIDATED_TAGS
        .iter()
        .copied()
        .filter(|tag| !PROVIDED_TAGS.contains(tag))
        .collect()
}
