use regex::Regex;

/// A password-reset token: 32 random bytes, hex-encoded to 64 characters.
/// Construction goes through `generate` or `parse`, so a value of this type
/// is always well-formed.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResetToken(String);

#[derive(Debug, thiserror::Error)]
#[error("malformed reset token")]
pub struct MalformedResetToken;

impl ResetToken {
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        ResetToken(hex::encode(bytes))
    }

    /// Anything that is not exactly 64 hex characters is rejected here,
    /// before any store lookup happens.
    pub fn parse(s: &str) -> Result<Self, MalformedResetToken> {
        let well_formed =
            Regex::new(r"^[0-9a-fA-F]{64}$").is_ok_and(|re| re.is_match(s));
        if well_formed {
            Ok(ResetToken(s.to_ascii_lowercase()))
        } else {
            Err(MalformedResetToken)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines; the full token never hits the logs.
    pub fn abbrev(&self) -> &str {
        &self.0[..8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let token = ResetToken::generate();
        assert_eq!(token.as_str().len(), 64);
        assert!(token.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_round_trip_through_parse() {
        let token = ResetToken::generate();
        let parsed = ResetToken::parse(token.as_str()).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert!(ResetToken::parse("").is_err());
        assert!(ResetToken::parse("abc123").is_err());
        assert!(ResetToken::parse(&"g".repeat(64)).is_err());
        assert!(ResetToken::parse(&"a".repeat(63)).is_err());
        assert!(ResetToken::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn parse_normalizes_case() {
        let upper = "ABCDEF0123456789".repeat(4);
        let token = ResetToken::parse(&upper).unwrap();
        assert_eq!(token.as_str(), upper.to_lowercase());
    }
}
