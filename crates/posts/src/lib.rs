//! Posts domain module.
//!
//! This crate contains the publication rules for blog posts, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage). Orchestration
//! against a store lives in `quill-infra::lifecycle`.

pub mod post;
pub mod tags;

pub use post::{Post, PostDraft, PostStatus};
pub use tags::Tags;
