//! # Pusaka Catalog
//!
//! Shared naskah model and payloads.
//!
//! Everything the server, the ingest tool, and the tester exchange lives
//! here: the naskah record as it is stored and served, the create/update
//! payloads, and the page-image URL scheme of the hosting service.

pub mod manuscript;
pub mod media;

pub use manuscript::{CreateManuscript, Manuscript, UpdateManuscript, DEFAULT_CATEGORY};
pub use media::{page_image_url, page_image_urls, MediaUpload};
