use crate::config;
use crate::types::mayday::UserId;

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use base64::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::algorithms::MACLike;
use jwt_simple::prelude::{
    Claims, Duration as JwtDuration, HS256Key, NoCustomClaims, VerificationOptions,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

use std::collections::HashSet;

/// Verifies and mints the HS256 session tokens that carry a user id.
#[derive(Debug, Clone)]
pub struct AuthState {
    key: HS256Key,
    issuer: String,
    cookie_name: String,
    token_ttl: time::Duration,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid auth key")]
    InvalidKey,
    #[error("invalid auth token")]
    InvalidToken,
    #[error("auth token missing expiry")]
    MissingExpiry,
    #[error("auth token missing subject")]
    MissingSubject,
}

impl AuthState {
    pub fn from_config(config: &config::AppConfig) -> Result<Option<Self>, AuthError> {
        let Some(auth) = config.auth.as_ref() else {
            return Ok(None);
        };
        Self::new(auth, &config.app_name).map(Some)
    }

    pub fn new(auth: &config::AuthConfig, issuer: &str) -> Result<Self, AuthError> {
        let key_bytes = decode_key(&auth.key)?;
        Ok(Self {
            key: HS256Key::from_bytes(&key_bytes),
            issuer: issuer.to_string(),
            cookie_name: auth.cookie_name.clone(),
            token_ttl: auth.token_ttl,
        })
    }

    pub fn issue_token(&self, user_id: &UserId) -> Result<String, AuthError> {
        self.issue_token_with_ttl(user_id, self.token_ttl)
    }

    pub fn issue_token_with_ttl(
        &self,
        user_id: &UserId,
        ttl: time::Duration,
    ) -> Result<String, AuthError> {
        let ttl_seconds = ttl.whole_seconds();
        if ttl_seconds <= 0 || user_id.as_str().trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let claims = Claims::create(JwtDuration::from_secs(ttl_seconds as u64))
            .with_subject(user_id.as_str())
            .with_issuer(&self.issuer);
        self.key
            .authenticate(claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let mut options = VerificationOptions::default();
        let mut issuers = HashSet::new();
        issuers.insert(self.issuer.clone());
        options.allowed_issuers = Some(issuers);

        let claims = self
            .key
            .verify_token::<NoCustomClaims>(token, Some(options))
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.expires_at.is_none() {
            return Err(AuthError::MissingExpiry);
        }

        let subject = claims.subject.ok_or(AuthError::MissingSubject)?;
        if subject.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(UserId::new(subject))
    }

    /// Bearer header first, then the session cookie.
    pub fn token_from_headers<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        bearer_token(headers).or_else(|| auth_cookie(headers, &self.cookie_name))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn auth_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

fn decode_key(raw: &str) -> Result<Vec<u8>, AuthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidKey);
    }

    let decoded = decode_config(trimmed, URL_SAFE_NO_PAD)
        .or_else(|_| decode_config(trimmed, STANDARD))
        .or_else(|_| decode_config(trimmed, STANDARD_NO_PAD))
        .map_err(|_| AuthError::InvalidKey)?;

    if decoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }

    Ok(decoded)
}

pub fn generate_auth_key() -> Result<String, AuthError> {
    let mut rng = OsRng;
    generate_auth_key_with_rng(&mut rng)
}

pub(crate) fn generate_auth_key_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    let encoded = encode_config(bytes, URL_SAFE_NO_PAD);
    if encoded.is_empty() {
        return Err(AuthError::InvalidKey);
    }
    Ok(encoded)
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;

    pub(crate) const TEST_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    pub(crate) fn test_auth_config() -> config::AuthConfig {
        config::AuthConfig {
            key: TEST_KEY.to_string(),
            token_ttl: time::Duration::hours(1),
            cookie_name: "mayday_auth".to_string(),
        }
    }

    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for value in dest.iter_mut() {
                *value = 0;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    #[test]
    fn generate_auth_key_with_rng__should_match_fixture() {
        // Given
        let mut rng = ZeroRng;

        // When
        let key = generate_auth_key_with_rng(&mut rng).expect("auth key");

        // Then
        assert_eq!(key, TEST_KEY);
    }

    #[test]
    fn verify_token__should_return_subject_of_issued_token() {
        // Given
        let auth = AuthState::new(&test_auth_config(), "Mayday").expect("auth state");
        let token = auth.issue_token(&UserId::new("user-1")).expect("token");

        // When
        let user_id = auth.verify_token(&token).expect("verify");

        // Then
        assert_eq!(user_id, UserId::new("user-1"));
    }

    #[test]
    fn verify_token__should_reject_other_issuer() {
        // Given
        let other = AuthState::new(&test_auth_config(), "Other").expect("auth state");
        let auth = AuthState::new(&test_auth_config(), "Mayday").expect("auth state");
        let token = other.issue_token(&UserId::new("user-1")).expect("token");

        // Then
        assert_eq!(auth.verify_token(&token), Err(AuthError::InvalidToken));
        assert_eq!(auth.verify_token("garbage"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn issue_token__should_reject_empty_subject_and_ttl() {
        let auth = AuthState::new(&test_auth_config(), "Mayday").expect("auth state");

        assert!(auth.issue_token(&UserId::new(" ")).is_err());
        assert!(
            auth.issue_token_with_ttl(&UserId::new("user-1"), time::Duration::ZERO)
                .is_err()
        );
    }

    #[test]
    fn new__should_reject_empty_key() {
        let mut config = test_auth_config();
        config.key = "  ".to_string();

        assert_eq!(
            AuthState::new(&config, "Mayday").err(),
            Some(AuthError::InvalidKey)
        );
    }

    #[test]
    fn token_from_headers__should_prefer_bearer_over_cookie() {
        // Given
        let auth = AuthState::new(&test_auth_config(), "Mayday").expect("auth state");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; mayday_auth=cookie-token"));

        // Then
        assert_eq!(auth.token_from_headers(&headers), Some("cookie-token"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(auth.token_from_headers(&headers), Some("header-token"));
    }
}
