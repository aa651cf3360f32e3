use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::config::TokenConfig;

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,  // user ID
    pub iat: usize, // issued at
    pub exp: usize, // expiration time
}

/// Signs and checks the session tokens handed out on register and login.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::days(config.ttl_days),
        }
    }

    /// Signs a token for `subject`, expiring one ttl from now.
    pub fn issue(&self, subject: Uuid) -> Result<String, AuthError> {
        self.issue_at(subject, OffsetDateTime::now_utc())
    }

    /// Signs with an explicit issue instant instead of the wall clock.
    pub fn issue_at(&self, subject: Uuid, issued_at: OffsetDateTime) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject,
            iat: issued_at.unix_timestamp() as usize,
            exp: (issued_at + self.ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Token(e.to_string()))?;
        debug!(subject = %subject, "token issued");
        Ok(token)
    }

    /// Checks signature and expiry. No route consumes tokens yet; this
    /// closes the round trip for callers.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| AuthError::Token(e.to_string()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&TokenConfig {
            secret: "dev-secret".into(),
            ttl_days: 7,
        })
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue(user_id).expect("issue token");
        let claims = issuer.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn expiry_sits_one_ttl_after_issue() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4()).expect("issue token");
        let claims = issuer.verify(&token).expect("verify token");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        assert!(now - claims.iat < 5);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let past = OffsetDateTime::now_utc() - Duration::days(8);
        let token = issuer
            .issue_at(Uuid::new_v4(), past)
            .expect("issue token in the past");
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenIssuer::new(&TokenConfig {
            secret: "other-secret".into(),
            ttl_days: 7,
        });
        let token = other.issue(Uuid::new_v4()).expect("issue token");
        assert!(issuer().verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(issuer().verify("not-a-token").is_err());
    }
}
