use chrono::{DateTime, Duration, TimeZone, Utc};

use hmac::Mac;

use url::Url;

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};

use super::SigningKey;

lazy_static::lazy_static! {
    // Signature encoding engine
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

/// Various errors that can occur when verifying a signed link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Link signature does not match")]
    SignatureMismatch,
    #[error("Link is expired")]
    Expired,
    #[error("Failed to decode link signature")]
    DecodeError,
}

/// Wrapper for link results
pub type LinkResult<T> = Result<T, LinkError>;

/// A stateless, signed claim over an email address, carried as query
/// parameters (`email`, optional `expires`, `signature`) on an emailed URL.
///
/// The signature is an HMAC-SHA256 over the canonical message
/// `email=<email>&expires=<unix-ts>` (or `email=<email>` for permanent
/// links), base64url-encoded without padding.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedLink {
    email: String,
    expires: Option<i64>,
}

impl SignedLink {
    /// Start a permanent (non-expiring) link for the given address
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            expires: None,
        }
    }

    /// Set the link to expire after the specified duration
    pub fn expires_in(self, ttl: Duration) -> Self {
        self.expires_at(Utc::now() + ttl)
    }

    /// Set the link to expire at a specific instant
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at.timestamp());
        self
    }

    /// Rebuild the claim from received query parameters for verification
    pub fn from_query(email: &str, expires: Option<i64>) -> Self {
        Self {
            email: email.to_string(),
            expires,
        }
    }

    /// Sign the canonical message, returning the encoded signature
    pub fn sign(&self, key: &SigningKey) -> String {
        let mac = key.as_ref().clone().chain_update(self.message().as_bytes());

        BASE64_ENGINE.encode(mac.finalize().into_bytes())
    }

    /// Verify a received signature against this claim.
    ///
    /// The MAC comparison is constant-time; expiry is only checked once the
    /// signature is known to be authentic, so an attacker learns nothing
    /// about a link they could not have produced.
    pub fn verify(&self, key: &SigningKey, signature: &str) -> LinkResult<()> {
        let signature = BASE64_ENGINE
            .decode(signature)
            .map_err(|_| LinkError::DecodeError)?;

        key.as_ref()
            .clone()
            .chain_update(self.message().as_bytes())
            .verify_slice(&signature)
            .map_err(|_| LinkError::SignatureMismatch)?;

        if self.is_expired() {
            return Err(LinkError::Expired);
        }

        Ok(())
    }

    /// Render the full signed URL under `base`, e.g.
    /// `https://example.com/newsletter/confirm?email=..&expires=..&signature=..`
    pub fn to_url(&self, base: &Url, path: &str, key: &SigningKey) -> Result<Url, url::ParseError> {
        let mut url = base.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("email", &self.email);
            if let Some(expires) = self.expires {
                pairs.append_pair("expires", &expires.to_string());
            }
            pairs.append_pair("signature", &self.sign(key));
        }

        Ok(url)
    }

    fn message(&self) -> String {
        match self.expires {
            Some(expires) => format!("email={}&expires={}", self.email, expires),
            None => format!("email={}", self.email),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires {
            None => false,
            Some(ts) => Utc
                .timestamp_opt(ts, 0)
                // Resolve ambiguous instants to the earliest candidate
                .earliest()
                .map(|exp| Utc::now() > exp)
                // An unrepresentable timestamp counts as expired
                .unwrap_or(true),
        }
    }
}
