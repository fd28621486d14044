//! The `token` cookie carrying the provider credential.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr};

pub const CREDENTIAL_COOKIE_NAME: &str = "token";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        })
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => Err(format!(
                "invalid SameSite value {other:?}, expected strict, lax or none"
            )),
        }
    }
}

/// Security attributes for the credential cookie.
#[derive(Clone, Debug)]
pub struct CookieConfig {
    secure: bool,
    http_only: bool,
    same_site: SameSite,
    max_age_seconds: Option<u64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age_seconds: None,
        }
    }
}

impl CookieConfig {
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_max_age_seconds(mut self, max_age_seconds: Option<u64>) -> Self {
        self.max_age_seconds = max_age_seconds;
        self
    }

    /// Build the `Set-Cookie` value. Session-scoped unless a max age is set.
    ///
    /// # Errors
    /// Returns an error if the credential contains bytes not allowed in a header.
    pub fn credential_cookie(
        &self,
        credential: &SecretString,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{CREDENTIAL_COOKIE_NAME}={}; Path=/",
            credential.expose_secret()
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        // Browsers drop SameSite=None cookies that are not Secure.
        if self.secure || self.same_site == SameSite::None {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site));
        if let Some(max_age) = self.max_age_seconds {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }

        let mut value = HeaderValue::from_str(&cookie)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Read the credential from the request's `Cookie` header(s).
pub fn extract_credential(headers: &HeaderMap) -> Option<SecretString> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == CREDENTIAL_COOKIE_NAME).then(|| val.trim())
        })
        .find(|val| !val.is_empty())
        .map(|val| SecretString::from(val.to_string()))
}
