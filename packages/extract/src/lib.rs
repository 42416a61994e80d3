//! Schema-Guided Website Extraction
//!
//! A small client library for turning websites into structured data through
//! an external extraction API. The application supplies a URL, a
//! natural-language prompt, and an optional user-built schema; the library
//! compiles the schema, makes the call, and renders the returned records
//! for display and download.
//!
//! # Usage
//!
//! ```rust,ignore
//! use extract::{FirecrawlExtractor, SchemaFieldStore, FieldType, format};
//!
//! let mut fields = SchemaFieldStore::new();
//! fields.update_field(0, "title", FieldType::Str);
//!
//! let extractor = FirecrawlExtractor::from_env()?;
//! let urls = vec!["https://example.com".to_string()];
//! let result = extractor
//!     .extract(&urls, "get the title", fields.compile().as_ref())
//!     .await?;
//!
//! let table = format::to_markdown_table(&result.records);
//! ```
//!
//! # Modules
//!
//! - [`schema`] - Schema field store and compilation to an API descriptor
//! - [`client`] - `Extractor` trait and the Firecrawl implementation
//! - [`format`] - Markdown table, JSON and CSV rendering
//! - [`conversation`] - Append-only chat transcript
//! - [`credentials`] - API key handling that never leaks into logs
//! - [`testing`] - Mock extractor for tests

pub mod client;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod format;
pub mod schema;
pub mod testing;

pub use client::{ExtractionResult, Extractor, FirecrawlExtractor, Record};
pub use conversation::{ConversationLog, ConversationTurn, Role};
pub use credentials::ApiKey;
pub use error::{ExtractError, FormatError, Result};
pub use schema::{FieldType, SchemaDescriptor, SchemaField, SchemaFieldStore, MAX_FIELDS};
pub use testing::MockExtractor;
