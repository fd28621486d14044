//! # Enrol (Endpoint Registration Gateway)
//!
//! `enrol` lets a remote device bind a callback endpoint to a verified external
//! identity. It does three things:
//!
//! 1. **Key distribution:** publishes the uncompressed P-256 public point of a
//!    server-held key so callers can derive a shared secret (`GET /pubkey`).
//! 2. **OAuth login:** runs the authorization-code flow against GitHub and hands
//!    the resulting bearer credential back to the caller as the `token` cookie.
//! 3. **Registration:** resolves the identity behind the credential and upserts
//!    `{identity, endpoint}` into the registration store (`POST /register`).
//!
//! ## Key Material
//!
//! The private key is generated once with `enrol keygen` (SEC1 PEM, never
//! overwritten) and supplied to the server through `ENROL_PRIVATE_KEY`. The
//! derived public point is computed at startup and is immutable afterwards.
//!
//! ## Request Failures
//!
//! Every request-scoped failure turns into a local HTTP response. Only startup
//! errors (bad key material, invalid configuration) stop the process.

pub mod cli;
pub mod enrol;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
