//! Handshake authentication: the auth data attached to a client, and a JWT
//! helper that plugs in as the `authenticate` hook.
//!
//! The core itself never inspects tokens; it only stores whatever
//! [`AuthData`] the configured hook returns and takes the client's user id
//! from `jwt.sub`. [`JwtAuthenticator`] covers the common HS256 case: sign
//! tokens server-side, verify them at the handshake.
//!
//! ## Example Usage
//! ```
//! use dialogue::auth::JwtAuthenticator;
//!
//! let auth = JwtAuthenticator::new("super-secret-key");
//! let token = auth.sign("user42".into(), 3600).unwrap();
//! let claims = auth.verify(&token).unwrap();
//! assert_eq!(claims.sub, "user42");
//! ```

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded JWT payload carried by an authenticated client.
///
/// ## Fields
/// - `sub`: Subject — becomes the client's user id.
/// - `exp`: Expiration — UNIX timestamp when the token expires.
/// - `iat`: Issued-at — UNIX timestamp when the token was minted.
/// - `custom`: Any additional claims, preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
  pub sub: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exp: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub iat: Option<usize>,
  #[serde(flatten)]
  pub custom: Map<String, Value>,
}

impl JwtClaims {
  pub fn new(sub: impl Into<String>) -> Self {
    Self {
      sub: sub.into(),
      exp: None,
      iat: None,
      custom: Map::new(),
    }
  }
}

/// Authentication result attached to a connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthData {
  pub jwt: JwtClaims,
}

impl AuthData {
  pub fn new(claims: JwtClaims) -> Self {
    Self { jwt: claims }
  }

  /// The user id the client registry indexes by.
  pub fn user_id(&self) -> &str {
    &self.jwt.sub
  }
}

/// Configuration options for JWT validation.
///
/// ## Fields
/// - `leeway`: Allowed clock skew in seconds.
/// - `issuer`: Optional expected issuer string.
/// - `audience`: Optional expected audience string.
#[derive(Clone, Default)]
pub struct JwtAuthenticatorOptions {
  pub leeway: u64,
  pub issuer: Option<String>,
  pub audience: Option<String>,
}

/// HS256 signer/verifier for handshake tokens.
#[derive(Clone)]
pub struct JwtAuthenticator {
  secret: String,
  options: JwtAuthenticatorOptions,
}

impl JwtAuthenticator {
  /// Creates a new authenticator.
  ///
  /// ## Parameters
  /// - `secret`: The signing key used to encode and decode JWTs.
  pub fn new(secret: &str) -> Self {
    Self {
      secret: secret.into(),
      options: JwtAuthenticatorOptions::default(),
    }
  }

  /// Creates a new authenticator with configurable validation options.
  pub fn with_options(secret: &str, options: JwtAuthenticatorOptions) -> Self {
    Self {
      secret: secret.into(),
      options,
    }
  }

  /// Signs a token for a user with a custom expiry.
  ///
  /// ## Parameters
  /// - `user_id`: ID of the user seeking authentication; becomes `sub`.
  /// - `ttl_secs`: Time-to-live in seconds for the token.
  ///
  /// ## Returns
  /// - `Result<String>`: Encoded JWT token or an error.
  pub fn sign(&self, user_id: String, ttl_secs: usize) -> Result<String> {
    self.sign_with_claims(user_id, ttl_secs, Map::new())
  }

  /// Signs a token carrying additional custom claims.
  pub fn sign_with_claims(
    &self,
    user_id: String,
    ttl_secs: usize,
    custom: Map<String, Value>,
  ) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let exp = now.saturating_add(ttl_secs as i64) as usize;

    let claims = JwtClaims {
      sub: user_id,
      exp: Some(exp),
      iat: Some(now as usize),
      custom,
    };
    encode(
      &Header::default(),
      &claims,
      &EncodingKey::from_secret(self.secret.as_ref()),
    )
    .context("Failed to encode token.")
  }

  /// Verifies a token and returns its claims if valid.
  pub fn verify(&self, token: &str) -> Result<JwtClaims> {
    let mut validation = Validation::default();
    validation.leeway = self.options.leeway;
    if let Some(ref iss) = self.options.issuer {
      validation.set_issuer(&[iss]);
    }
    if let Some(ref aud) = self.options.audience {
      validation.set_audience(&[aud]);
    }
    let data = decode::<JwtClaims>(
      token,
      &DecodingKey::from_secret(self.secret.as_ref()),
      &validation,
    )
    .context("Failed to decode token")?;
    Ok(data.claims)
  }

  /// Authenticate a handshake payload carrying a `token` field.
  ///
  /// This is the shape the `authenticate` hook expects; wire it up with
  /// `DialogueBuilder::authenticate_with_jwt`.
  pub fn authenticate(&self, auth_payload: &Value) -> Result<AuthData, String> {
    let token = auth_payload
      .get("token")
      .and_then(Value::as_str)
      .ok_or_else(|| "Handshake is missing an auth token".to_string())?;
    let claims = self.verify(token).map_err(|e| e.to_string())?;
    Ok(AuthData::new(claims))
  }
}

/// ######################################## TESTS ########################################
