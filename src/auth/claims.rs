use serde::{Deserialize, Serialize};
use shorty_error::AuthError;

use crate::clock::Millis;

/// Payload of a session token. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Username the token is bound to.
    pub sub: String,
    pub iat: Millis,
    pub exp: Millis,
    /// Random id, for log correlation only.
    pub jti: String,
}

impl TokenClaims {
    /// Rejects claims no issued token can carry.
    pub fn check(&self) -> Result<(), AuthError> {
        let malformed = |reason: &str| {
            Err(AuthError::MalformedClaims {
                reason: reason.to_string(),
            })
        };
        if self.sub.is_empty() {
            return malformed("empty subject");
        }
        if self.jti.is_empty() {
            return malformed("empty token id");
        }
        if self.exp <= self.iat {
            return malformed("expiry not after issue time");
        }
        Ok(())
    }

    pub fn is_expired_at(
        &self,
        now: Millis,
    ) -> bool {
        now >= self.exp
    }

    /// `true` if the account changed after this token was issued.
    pub fn predates(
        &self,
        updated_at: Millis,
    ) -> bool {
        self.iat < updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(
        iat: Millis,
        exp: Millis,
    ) -> TokenClaims {
        TokenClaims {
            sub: "alice".into(),
            iat,
            exp,
            jti: "j".into(),
        }
    }

    #[test]
    fn test_check() {
        assert!(claims(1, 2).check().is_ok());
        assert!(claims(2, 2).check().is_err());
        let mut c = claims(1, 2);
        c.sub.clear();
        assert!(matches!(c.check(), Err(AuthError::MalformedClaims { .. })));
    }

    #[test]
    fn test_expiry_boundary() {
        let c = claims(0, 100);
        assert!(!c.is_expired_at(99));
        assert!(c.is_expired_at(100));
    }

    #[test]
    fn test_predates() {
        let c = claims(100, 200);
        assert!(!c.predates(100));
        assert!(c.predates(101));
    }

    #[test]
    fn test_missing_claim_fails_to_decode() {
        let json = r#"{"sub":"alice","iat":1,"jti":"x"}"#;
        assert!(serde_json::from_str::<TokenClaims>(json).is_err());
    }
}
