//! Sanitizes untrusted post-login redirect targets into internal relative
//! paths, plus a small HTTP service that applies the policy.

pub mod config;
pub mod path_guard;
pub mod server;

mod decode;
mod normalize;
mod scan;

pub use path_guard::{RedirectPolicy, sanitize_redirect_path};
