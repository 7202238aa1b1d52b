use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::auth_log::AuthFailure;
use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

/// Who a token is issued for.
pub struct TokenSubject<'a> {
    pub user_id: u64,
    pub email: &'a str,
    pub role: u8,
    pub employee_id: Option<u64>,
}

pub fn issue_token(
    subject: &TokenSubject<'_>,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), AuthFailure> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.email.to_string(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthFailure::MissingConfig(format!("token signing failed: {e}")))?;

    Ok((token, claims))
}

pub fn generate_access_token(subject: &TokenSubject<'_>, secret: &str, ttl: usize) -> Result<String, AuthFailure> {
    issue_token(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &TokenSubject<'_>,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), AuthFailure> {
    issue_token(subject, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthFailure> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthFailure::TokenExpired,
        _ => AuthFailure::InvalidToken,
    })
}

/// Extracts the bearer token from an `Authorization` header value.
pub fn bearer(header: Option<&str>) -> Result<&str, AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingToken)?;
    header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(AuthFailure::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn subject() -> TokenSubject<'static> {
        TokenSubject {
            user_id: 7,
            email: "maria@empresa.com",
            role: 2,
            employee_id: Some(11),
        }
    }

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let (token, claims) = generate_refresh_token(&subject(), SECRET, 60).unwrap();
        let verified = verify_token(&token, SECRET).unwrap();
        assert_eq!(verified.jti, claims.jti);
        assert_eq!(verified.token_type, TokenType::Refresh);
        assert_eq!(verified.employee_id, Some(11));
    }

    #[test]
    fn wrong_secret_is_an_invalid_token() {
        let token = generate_access_token(&subject(), SECRET, 60).unwrap();
        assert_eq!(verify_token(&token, "other").unwrap_err(), AuthFailure::InvalidToken);
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let claims = Claims {
            user_id: 7,
            sub: "maria@empresa.com".into(),
            role: 2,
            exp: now() - 3600,
            jti: "old".into(),
            token_type: TokenType::Access,
            employee_id: None,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap_err(), AuthFailure::TokenExpired);
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer(None), Err(AuthFailure::MissingToken));
        assert_eq!(bearer(Some("Basic abc")), Err(AuthFailure::InvalidToken));
        assert_eq!(bearer(Some("Bearer ")), Err(AuthFailure::InvalidToken));
    }
}
