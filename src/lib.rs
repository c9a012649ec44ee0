//! Client core for a personal-brand marketing site: a tag-invalidating
//! resource cache over the remote content API, the ordered-block blog
//! document model, and the newsletter subscriber aggregate.
//!
//! # Examples
//!
//! Authoring a post body with [`document::Document`]:
//! ```
//! use sitekit::document::{BlockKind, Document, RenderNode};
//!
//! let mut doc = Document::new();
//! let intro = doc.blocks()[0].id;
//! doc.set_content(intro, "intro").expect("set");
//! let list = doc.add_block(BlockKind::BulletList, None);
//! doc.set_content(list, "x\ny").expect("set");
//!
//! let nodes = doc.render();
//! assert_eq!(nodes[0], RenderNode::Paragraph("intro".to_string()));
//! assert_eq!(
//!     nodes[1],
//!     RenderNode::List { ordered: false, items: vec!["x".to_string(), "y".to_string()] }
//! );
//! assert_eq!(doc.serialize().content, "intro\n\nx\ny");
//! ```
//!
//! Running the resource client against the live API:
//! ```no_run
//! use std::sync::Arc;
//!
//! use sitekit::{
//!     core::cache::CacheStore,
//!     runtime::handle::{ClientConfig, RefetchSignals, spawn_client},
//!     transport::http::HttpTransport,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let transport = Arc::new(HttpTransport::new("https://api.example.com"));
//! let signals = RefetchSignals::new();
//! let client = spawn_client(CacheStore::new(), transport, &signals, ClientConfig::default());
//!
//! let mut blogs = client.public_blogs(1, 10, None).await.expect("subscribe");
//! let page = blogs.resolved().await.expect("resolve");
//! assert!(page.error.is_none());
//!
//! client.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Blog post, book, and social-link aggregates.
pub mod content;
/// Pure cache store owned by the client loop.
pub mod core;
/// Ordered-block blog body model and rendering projection.
pub mod document;
/// Typed endpoint registry and request descriptors.
pub mod endpoint;
/// Subscriber records, validation, and statistics.
pub mod newsletter;
/// Single-writer client runtime, handles, and events.
pub mod runtime;
/// Transport seam and reqwest implementation.
pub mod transport;
/// Shared identifiers, tags, and small enums.
pub mod types;
