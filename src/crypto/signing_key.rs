use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::Secret;

/// The server-side HMAC-SHA256 key all emailed links are signed with.
///
/// Links signed with one key cannot be verified after the key rotates;
/// permanent unsubscribe links in already-delivered issues die with it.
#[derive(Clone)]
pub struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    pub fn new(key: &Secret<String>) -> anyhow::Result<Self> {
        use secrecy::ExposeSecret;

        let hmac = Hmac::new_from_slice(key.expose_secret().as_bytes())?;

        Ok(Self(hmac))
    }
}

impl AsRef<Hmac<Sha256>> for SigningKey {
    fn as_ref(&self) -> &Hmac<Sha256> {
        &self.0
    }
}
