use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Access token claims as issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller's subject; becomes the owner id of everything they create
    pub sub: Uuid,
    #[serde(rename = "cognito:groups", default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, groups: Vec<String>, security: &SecurityConfig) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(security.jwt_expiry_hours as i64)).timestamp();

        Self {
            sub,
            groups,
            token_use: Some("access".to_string()),
            iss: security.jwt_issuer.clone(),
            exp,
            iat: now.timestamp(),
        }
    }

}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Token is not an access token")]
    WrongTokenUse,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verifies signature, expiry and (when configured) issuer, then checks `token_use`
pub fn decode_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    if let Some(issuer) = &security.jwt_issuer {
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
    }

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?
        .claims;

    match claims.token_use.as_deref() {
        None | Some("access") => Ok(claims),
        Some(_) => Err(JwtError::WrongTokenUse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        let mut security = AppConfig::development().security;
        security.jwt_secret = "test-secret".to_string();
        security
    }

    #[test]
    fn round_trip_keeps_subject_and_groups() {
        let security = security();
        let sub = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(sub, vec!["admin".to_string()], &security), &security).unwrap();

        let claims = decode_jwt(&token, &security).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.groups, vec!["admin".to_string()]);
    }

    #[test]
    fn groups_use_provider_claim_name() {
        let security = security();
        let claims = Claims::new(Uuid::new_v4(), vec!["agent".to_string()], &security);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["cognito:groups"][0], "agent");
    }

    #[test]
    fn id_tokens_are_refused() {
        let security = security();
        let mut claims = Claims::new(Uuid::new_v4(), vec![], &security);
        claims.token_use = Some("id".to_string());
        let token = generate_jwt(&claims, &security).unwrap();

        assert!(matches!(decode_jwt(&token, &security), Err(JwtError::WrongTokenUse)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let security = security();
        let token = generate_jwt(&Claims::new(Uuid::new_v4(), vec![], &security), &security).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "other-secret".to_string();
        assert!(matches!(decode_jwt(&token, &other), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn issuer_is_checked_when_configured() {
        let security = security();
        let token = generate_jwt(&Claims::new(Uuid::new_v4(), vec![], &security), &security).unwrap();

        let mut strict = security.clone();
        strict.jwt_issuer = Some("https://issuer.example.com".to_string());
        assert!(decode_jwt(&token, &strict).is_err());
    }

    #[test]
    fn configured_issuer_must_be_present() {
        let security = security();
        let mut strict = security.clone();
        strict.jwt_issuer = Some("https://issuer.example.com".to_string());

        let token = generate_jwt(&Claims::new(Uuid::new_v4(), vec![], &security), &security).unwrap();
        assert!(matches!(decode_jwt(&token, &strict), Err(JwtError::InvalidToken(_))));

        let issued = generate_jwt(&Claims::new(Uuid::new_v4(), vec![], &strict), &strict).unwrap();
        assert!(decode_jwt(&issued, &strict).is_ok());
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let security = AppConfig::development().security;
        let claims = Claims::new(Uuid::new_v4(), vec![], &security);
        assert!(matches!(generate_jwt(&claims, &security), Err(JwtError::InvalidSecret)));
    }
}
