//! Request authentication gate.

/// Decides whether a caller-supplied credential is acceptable.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credential: Option<&str>) -> bool;
}

/// Accepts exactly one pre-shared key.
pub struct ApiKeyAuthenticator {
    key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn authenticate(&self, credential: Option<&str>) -> bool {
        credential.is_some_and(|c| constant_time_eq(c.as_bytes(), self.key.as_bytes()))
    }
}

/// Comparison whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_key() {
        let auth = ApiKeyAuthenticator::new("s3cret");
        assert!(auth.authenticate(Some("s3cret")));
    }

    #[test]
    fn test_rejects_missing_or_wrong_key() {
        let auth = ApiKeyAuthenticator::new("s3cret");
        assert!(!auth.authenticate(None));
        assert!(!auth.authenticate(Some("")));
        assert!(!auth.authenticate(Some("s3cre")));
        assert!(!auth.authenticate(Some("s3creT")));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"", b""));
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
