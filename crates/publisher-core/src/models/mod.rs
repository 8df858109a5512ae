//! Data models for a publish attempt.
//!
//! Contains domain types for:
//! - [`ProjectReference`], [`ResolvedProject`] - The project being published
//! - [`CoverImage`], [`CapturedImage`], [`CoverFile`] - Cover image sources
//! - [`MediaPayload`] - The canonical upload form of a cover image
//! - [`GitHubPublishRequest`], [`CommunityPublishRequest`] - Backend payloads

mod cover;
mod project;
mod request;

pub use cover::{
    CapturedImage, CoverFile, CoverImage, DEFAULT_COVER_NAME, DEFAULT_IMAGE_TYPE, MediaPayload,
};
pub use project::{ProjectReference, ResolvedProject};
pub use request::{CommunityPublishRequest, GitHubPublishRequest, ProjectData};
