//! Webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Validates `sha256=<hex>` (or bare `<hex>`) HMAC-SHA256 signatures.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    /// `None` or an empty secret disables verification.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn from_config(config: &assistline_config::ContactCenterConfig) -> Self {
        let verifier = Self::new(config.webhook_secret.clone());
        if !verifier.is_enforced() {
            tracing::warn!("No contact-center webhook secret configured; signatures are not verified");
        }
        verifier
    }

    pub fn is_enforced(&self) -> bool {
        self.secret.is_some()
    }

    /// Check `signature` against `payload`. Always true when no secret is set.
    pub fn verify(&self, payload: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = &self.secret else {
            return true;
        };
        let Some(signature) = signature else {
            return false;
        };

        let sig_hex = signature.trim();
        let sig_hex = sig_hex.strip_prefix("sha256=").unwrap_or(sig_hex);
        let Ok(provided) = hex::decode(sig_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&provided).is_ok()
    }

    /// Hex signature for `payload`, prefixed with `sha256=`. `None` when disabled.
    pub fn sign(&self, payload: &[u8]) -> Option<String> {
        let secret = self.secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(payload);
        Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_secret_skips_validation() {
        let v = SignatureVerifier::new(None);
        assert!(v.verify(b"anything", None));
        assert!(v.verify(b"anything", Some("garbage")));
        assert!(!SignatureVerifier::new(Some(String::new())).is_enforced());
    }

    #[test]
    fn accepts_prefixed_and_bare_hex() {
        let v = SignatureVerifier::new(Some("s3cret".into()));
        let sig = v.sign(b"{\"a\":1}").unwrap();
        assert!(v.verify(b"{\"a\":1}", Some(&sig)));
        assert!(v.verify(b"{\"a\":1}", sig.strip_prefix("sha256=")));
    }

    #[test]
    fn rejects_tampered_missing_and_malformed() {
        let v = SignatureVerifier::new(Some("s3cret".into()));
        let sig = v.sign(b"body").unwrap();
        assert!(!v.verify(b"body!", Some(&sig)));
        assert!(!v.verify(b"body", None));
        assert!(!v.verify(b"body", Some("sha256=zz")));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        let v = SignatureVerifier::new(Some("Jefe".into()));
        let sig = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";
        assert!(v.verify(b"what do ya want for nothing?", Some(sig)));
    }

    #[test]
    fn debug_hides_secret() {
        let v = SignatureVerifier::new(Some("s3cret".into()));
        assert!(!format!("{v:?}").contains("s3cret"));
    }
}
