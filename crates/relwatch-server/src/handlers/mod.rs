//! Route handlers.

mod status;
mod updates;

pub use status::health;
pub use updates::{github_release, language_updates, library_updates, package_updates};
