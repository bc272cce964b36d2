//! JWT service for token generation, validation, and management
//!
//! Tokens are signed with HS256 using a shared secret so that the auth
//! service can issue them and the api service can verify them. Revoked
//! tokens are tracked in a Redis blacklist for their remaining lifetime.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{cache::RedisPool, models::Role};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret
    pub secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC secret used to sign and verify tokens
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.len() < 16 {
            anyhow::bail!("JWT_SECRET must be at least 16 bytes");
        }

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(604800);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Identity carried inside a token
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    fn now() -> Result<u64> {
        Ok(SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs())
    }

    fn issue(&self, subject: &TokenSubject, token_type: TokenType, ttl: u64) -> Result<String> {
        let now = Self::now()?;
        let claims = Claims {
            sub: subject.id,
            name: subject.name.clone(),
            email: subject.email.clone(),
            role: subject.role,
            approved: subject.approved,
            iat: now,
            exp: now + ttl,
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, subject: &TokenSubject) -> Result<String> {
        self.issue(subject, TokenType::Access, self.config.access_token_expiry)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, subject: &TokenSubject) -> Result<String> {
        self.issue(subject, TokenType::Refresh, self.config.refresh_token_expiry)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Seconds left before the given claims expire
    pub fn remaining_lifetime(&self, claims: &Claims) -> Result<u64> {
        Ok(claims.exp.saturating_sub(Self::now()?))
    }

    /// Check if a token is blacklisted in Redis
    pub async fn is_token_blacklisted(&self, redis_pool: &RedisPool, token: &str) -> Result<bool> {
        let key = format!("blacklisted_token:{}", token);
        let result = redis_pool.get(&key).await?;
        Ok(result.is_some())
    }

    /// Blacklist a token in Redis
    pub async fn blacklist_token(
        &self,
        redis_pool: &RedisPool,
        token: &str,
        expiry: u64,
    ) -> Result<()> {
        // SETEX rejects a zero TTL; an already expired token needs no entry
        if expiry == 0 {
            return Ok(());
        }
        let key = format!("blacklisted_token:{}", token);
        redis_pool.set(&key, "1", Some(expiry)).await?;
        Ok(())
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn service(access: u64) -> JwtService {
        JwtService::new(JwtConfig {
            secret: "unit-test-secret-0123456789".to_string(),
            access_token_expiry: access,
            refresh_token_expiry: 3600,
        })
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            id: Uuid::new_v4(),
            name: "Aes Saputra".to_string(),
            email: "aes@example.com".to_string(),
            role: Role::Admin,
            approved: true,
        }
    }

    #[test]
    fn access_token_carries_identity() {
        let svc = service(900);
        let who = subject();
        let token = svc.generate_access_token(&who).unwrap();
        let claims = svc.validate_token(&token).unwrap();

        assert_eq!(claims.sub, who.id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.approved);
        assert_eq!(claims.email, "aes@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn refresh_token_is_typed() {
        let svc = service(900);
        let token = svc.generate_refresh_token(&subject()).unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(svc.remaining_lifetime(&claims).unwrap() <= 3600);
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let svc = service(900);
        let token = svc.generate_access_token(&subject()).unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(svc.validate_token(&tampered).is_err());

        let other = JwtService::new(JwtConfig {
            secret: "another-secret-0123456789abc".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        });
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service(0);
        let token = svc.generate_access_token(&subject()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(svc.validate_token(&token).is_err());
    }

    #[test]
    #[serial]
    fn config_rejects_short_secret() {
        unsafe {
            std::env::set_var("JWT_SECRET", "short");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_SECRET", "long-enough-secret-value");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
        }
        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.access_token_expiry, 900);
        assert_eq!(config.refresh_token_expiry, 604800);

        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
    }
}
