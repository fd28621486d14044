use super::{
    keys::PublicKey, oauth::OAuthConfig, provider::Provider, session::CookieConfig,
    store::{KeyStrategy, RegistrationStore},
};
use std::sync::Arc;

/// Everything a request handler needs, built once at startup and shared
/// read-only behind an `Arc`.
#[derive(Debug)]
pub struct AppState {
    pub public_key: PublicKey,
    pub oauth: OAuthConfig,
    pub provider: Provider,
    pub store: Arc<dyn RegistrationStore>,
    pub cookie: CookieConfig,
    pub key_strategy: KeyStrategy,
}
