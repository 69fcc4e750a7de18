//! Credential issuing and validation.
//!
//! Signature and expiry checks are delegated to `jsonwebtoken`; this module
//! owns claim-shape validation and the mapping onto an [`Identity`]. Two
//! shapes are accepted: the compact tokens this service issues itself and
//! tokens minted by a federated identity provider, whose granted realm roles
//! are mapped through [`Role::from_realm_roles`].

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{Identity, Role, User};

/// Result of validating a presented credential, returned by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    Valid(Identity),
    Expired,
    Invalid,
}

/// Claims of tokens issued by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

struct FederatedKey {
    decoding_key: DecodingKey,
    issuer: Option<String>,
}

#[derive(Clone)]
pub struct CredentialValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_expiry_minutes: i64,
    federated: Option<std::sync::Arc<FederatedKey>>,
}

impl CredentialValidator {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret().as_bytes();

        let federated = match &config.federated_public_key_path {
            Some(path) => {
                let pem = fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read federated public key from {}: {}", path, e)
                })?;
                let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| anyhow::anyhow!("Failed to parse federated public key: {}", e))?;
                tracing::info!("Federated RS256 token verification enabled");
                Some(std::sync::Arc::new(FederatedKey {
                    decoding_key,
                    issuer: config.federated_issuer.clone(),
                }))
            }
            None => None,
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            federated,
        })
    }

    /// Sign an access token for a user.
    pub fn issue(&self, user: &User) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            email: user.email.clone(),
            iss: self.issuer.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    /// Verify a token and resolve its identity. Fails closed.
    pub fn validate(&self, token: &str) -> CredentialOutcome {
        let header = match decode_header(token) {
            Ok(header) => header,
            Err(_) => return CredentialOutcome::Invalid,
        };

        let decoded = match (header.alg, &self.federated) {
            (Algorithm::HS256, _) => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.set_issuer(&[&self.issuer]);
                decode::<Value>(token, &self.decoding_key, &validation)
            }
            (Algorithm::RS256, Some(federated)) => {
                let mut validation = Validation::new(Algorithm::RS256);
                validation.validate_aud = false;
                if let Some(issuer) = &federated.issuer {
                    validation.set_issuer(&[issuer]);
                }
                decode::<Value>(token, &federated.decoding_key, &validation)
            }
            (alg, _) => {
                tracing::debug!(?alg, "Rejected token with unsupported algorithm");
                return CredentialOutcome::Invalid;
            }
        };

        match decoded {
            Ok(data) => match identity_from_claims(&data.claims) {
                Some(identity) => CredentialOutcome::Valid(identity),
                None => {
                    tracing::debug!("Token claims did not describe a usable identity");
                    CredentialOutcome::Invalid
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => CredentialOutcome::Expired,
            Err(e) => {
                tracing::debug!(error = %e, "Token verification failed");
                CredentialOutcome::Invalid
            }
        }
    }
}

/// Map verified claims onto an identity.
///
/// Native shape: `sub`, `username`, `role`. Federated shape: `sub`,
/// `preferred_username`, `realm_access.roles`. `email` is optional in both.
/// Any missing claim, unparseable subject or unmapped role yields `None`.
pub fn identity_from_claims(claims: &Value) -> Option<Identity> {
    let user_id = claims.get("sub")?.as_str()?.parse::<Uuid>().ok()?;
    let email = claims
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_string);

    let (username, role) = match claims.get("role") {
        Some(role) => {
            let username = claims.get("username")?.as_str()?;
            let role = role.as_str()?.parse::<Role>().ok()?;
            (username, role)
        }
        None => {
            let username = claims.get("preferred_username")?.as_str()?;
            let granted: Vec<&str> = claims
                .get("realm_access")?
                .get("roles")?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .collect();
            (username, Role::from_realm_roles(&granted)?)
        }
    };

    if username.trim().is_empty() {
        return None;
    }

    Some(Identity {
        user_id,
        username: username.to_string(),
        role,
        email,
    })
}
