pub mod client;
pub mod identity;

pub use client::ClientAddr;
pub use identity::{CallerIdentity, IdentityResolver, StaticTokenResolver, DEV_USER};
