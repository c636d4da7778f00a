use hourfill_core::error::{HourfillError, Result};
use std::fmt;

/// Required length of an upstream API key
pub const API_KEY_LEN: usize = 40;

/// Validated upstream credential.
///
/// Only constructible through [`ApiKey::parse`], so holding one means the
/// fixed-length check already passed. `Debug` and `Display` never print the
/// full key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let len = raw.chars().count();
        if len != API_KEY_LEN {
            return Err(HourfillError::InvalidCredential {
                reason: format!(
                    "API key must be {} characters, got {}",
                    API_KEY_LEN, len
                ),
            });
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(HourfillError::InvalidCredential {
                reason: "API key must contain only ASCII letters and digits".to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// The raw key, for building authenticated requests only
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> String {
        format!("{}…", &self.0[..4])
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.redacted())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "abcdEFGH0123456789abcdEFGH0123456789wxyz";

    #[test]
    fn test_valid_key() {
        let key = ApiKey::parse(KEY).unwrap();
        assert_eq!(key.expose(), KEY);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert!(matches!(
            ApiKey::parse("short"),
            Err(HourfillError::InvalidCredential { .. })
        ));
        assert!(ApiKey::parse(&format!("{}a", KEY)).is_err());
        assert!(ApiKey::parse("").is_err());
    }

    #[test]
    fn test_non_alphanumeric_is_rejected() {
        let key = format!("{} ", &KEY[..39]);
        assert!(ApiKey::parse(&key).is_err());
    }

    #[test]
    fn test_key_is_redacted() {
        let key = ApiKey::parse(KEY).unwrap();
        assert_eq!(format!("{}", key), "abcd…");
        assert!(!format!("{:?}", key).contains(KEY));
    }
}
