use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::SignatureVerifier;

type HmacSha256 = Hmac<Sha256>;

/// Checks `X-Line-Signature`: base64 HMAC-SHA256 of the raw body keyed by the
/// channel secret.
pub struct LineSignatureVerifier {
    channel_secret: String,
}

impl LineSignatureVerifier {
    pub fn new(channel_secret: impl Into<String>) -> Self {
        Self {
            channel_secret: channel_secret.into(),
        }
    }

    fn mac(&self, body: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.channel_secret.as_bytes())
            .map_err(|err| anyhow!("invalid channel secret: {err}"))?;
        mac.update(body);
        Ok(mac)
    }

    pub fn sign(&self, body: &[u8]) -> Result<String> {
        Ok(BASE64.encode(self.mac(body)?.finalize().into_bytes()))
    }
}

impl SignatureVerifier for LineSignatureVerifier {
    fn verify(&self, body: &[u8], signature: &str) -> Result<()> {
        let signature = signature.trim();
        if signature.is_empty() {
            return Err(anyhow!("signature header is empty"));
        }
        let expected = BASE64
            .decode(signature)
            .context("signature is not valid base64")?;
        self.mac(body)?
            .verify_slice(&expected)
            .map_err(|_| anyhow!("signature does not match request body"))
    }
}
