use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Issues an HS256 token whose `sub` is the user id. Login lives elsewhere;
/// this is used by tooling and tests.
pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Returns the `sub` claim of a valid, unexpired token.
pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"rekber-test-secret";

    #[test]
    fn test_token_round_trip() {
        let user_id = uuid::Uuid::new_v4().to_string();
        let token = create_token(&user_id, SECRET, 600).unwrap();
        assert_eq!(decode_token(token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired_tokens() {
        let token = create_token("user", SECRET, 600).unwrap();
        assert!(decode_token(token, b"other-secret").is_err());

        let expired = create_token("user", SECRET, -3600).unwrap();
        assert!(decode_token(expired, SECRET).is_err());
    }

    #[test]
    fn test_empty_subject_is_rejected() {
        assert!(create_token("", SECRET, 600).is_err());
    }
}
