use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Identity;
use crate::providers::ProviderError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub sid: String, // Server-side session row
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, ProviderError> {
        Uuid::parse_str(&self.sub).map_err(|_| ProviderError::InvalidCredentials)
    }

    pub fn session_id(&self) -> Result<Uuid, ProviderError> {
        Uuid::parse_str(&self.sid).map_err(|_| ProviderError::InvalidCredentials)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_token_duration: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            access_token_duration,
        }
    }

    pub fn generate_access_token(
        &self,
        identity: &Identity,
        session_id: Uuid,
    ) -> Result<(String, DateTime<Utc>), ProviderError> {
        let now = Utc::now();
        let expires_at = now + self.access_token_duration;
        let claims = Claims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            sid: session_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            ProviderError::Unavailable(format!("Failed to generate access token: {}", e))
        })?;

        Ok((token, expires_at))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, ProviderError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| ProviderError::InvalidCredentials)?;

        Ok(token_data.claims)
    }
}
