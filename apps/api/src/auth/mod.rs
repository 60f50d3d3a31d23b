//! Authentication proxied to the hosted identity provider.

pub mod extractor;
pub mod google;
pub mod handlers;
pub mod identity;
pub mod profiles;
pub mod service;

pub use extractor::AuthUser;
