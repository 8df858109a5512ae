//! Destination flows.
//!
//! Each flow owns the inputs it collects, the rule that turns them into its
//! publish request and the only call to its backend endpoint. A session
//! holds exactly one flow at a time.

pub mod community;
pub mod github;

pub use community::{CommunityDraft, CommunityFlow, CommunityOptions};
pub use github::{GitHubFlow, RepoTarget};
