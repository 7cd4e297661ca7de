use serde::{Deserialize, Serialize};

/// One cookie record as persisted in the cookie artifact.
///
/// `expires` is UTC epoch seconds; `0.0` is the session-scoped sentinel
/// (no absolute expiry, valid until the browser session ends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// "Strict", "Lax" or "None" when the site set one.
    #[serde(default)]
    pub same_site: Option<String>,
    #[serde(default)]
    pub expires: f64,
}

impl StoredCookie {
    /// Expired means a numeric expiry strictly in the past. Session-scoped
    /// cookies (`expires == 0`) are always considered valid for reuse.
    pub fn is_expired(&self, now_epoch: f64) -> bool {
        self.expires > 0.0 && self.expires < now_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(expires: f64) -> StoredCookie {
        StoredCookie {
            name: "sid".into(),
            value: "abc".into(),
            domain: ".forum.example.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            same_site: Some("Lax".into()),
            expires,
        }
    }

    #[test]
    fn test_session_cookie_never_expires() {
        let c = cookie(0.0);
        assert!(!c.is_expired(2_000_000_000.0));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let c = cookie(1_000.0);
        assert!(c.is_expired(2_000.0));
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let c = cookie(3_000.0);
        assert!(!c.is_expired(2_000.0));
    }

    #[test]
    fn test_expiry_exactly_now_is_not_strictly_past() {
        let c = cookie(2_000.0);
        assert!(!c.is_expired(2_000.0));
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let c = cookie(1_234.5);
        let json = serde_json::to_string(&c).unwrap();
        let back: StoredCookie = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
