//! Encrypted, authenticated settings token
//!
//! Format: `st1.local.<payload>[.<footer>]`, both parts base64url without
//! padding. The payload is `nonce || ciphertext || tag` from ChaCha20-Poly1305
//! over the JSON claims. The header and the footer are bound as associated
//! data, so the footer is readable but cannot be altered.
//!
//! The layout resembles PASETO `local` tokens but is not compatible with
//! them: the nonce is random rather than derived, and the associated data is
//! a plain concatenation rather than pre-authentication encoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use ring::{
    aead::{self, Aad, LessSafeKey, Nonce, UnboundKey},
    hkdf,
    rand::{SecureRandom, SystemRandom},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SettingModel;

const HEADER: &str = "st1.local.";

const VERSION: &str = "st1";

const PURPOSE: &str = "local";

const NONCE_SIZE: usize = 12;

/// Salt for deriving the token key from configured key material (not secret)
const KEY_SALT: &[u8] = b"settings-manager-cache-token-v2";

const KEY_INFO: &[u8] = b"settings-cookie-cache";

/// Errors raised while sealing or opening a token
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Unsupported token version or purpose: {0}")]
    UnsupportedVersion(String),

    #[error("Token authentication failed")]
    Authentication,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("Token issuer mismatch: expected {expected}, found {found}")]
    IssuerMismatch { expected: String, found: String },

    #[error("Token subject mismatch: expected {expected}, found {found}")]
    SubjectMismatch { expected: String, found: String },

    #[error("Token expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("Token not valid before {0}")]
    NotYetValid(DateTime<Utc>),

    #[error("Token footer mismatch")]
    FooterMismatch,

    #[error("Settings payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Cryptographic failure: {0}")]
    Crypto(String),
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Claims carried inside the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iat: DateTime<Utc>,
    pub nbf: DateTime<Utc>,
    pub exp: DateTime<Utc>,
    pub iss: String,
    pub sub: String,
    /// Serialized setting list
    pub dt: String,
}

/// Seals setting lists into tokens and opens them again
pub struct TokenCodec {
    key: LessSafeKey,
    rng: SystemRandom,
    issuer: String,
    subject: String,
    footer: Option<String>,
}

impl TokenCodec {
    /// Derive the symmetric key from `key_material` with HKDF-SHA256
    pub fn new(
        key_material: &str,
        issuer: impl Into<String>,
        subject: impl Into<String>,
        footer: Option<String>,
    ) -> TokenResult<Self> {
        let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, KEY_SALT).extract(key_material.as_bytes());

        let mut key_bytes = [0u8; 32];
        prk.expand(&[KEY_INFO], hkdf::HKDF_SHA256)
            .map_err(|_| TokenError::Crypto("HKDF expansion failed".to_string()))?
            .fill(&mut key_bytes)
            .map_err(|_| TokenError::Crypto("key fill failed".to_string()))?;

        let unbound = UnboundKey::new(&aead::CHACHA20_POLY1305, &key_bytes)
            .map_err(|_| TokenError::Crypto("invalid key length".to_string()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
            issuer: issuer.into(),
            subject: subject.into(),
            footer,
        })
    }

    /// Seal `settings` into a token valid from `now` for `ttl`
    pub fn encode(&self, settings: &[SettingModel], now: DateTime<Utc>, ttl: Duration) -> TokenResult<String> {
        let claims = TokenClaims {
            iat: now,
            nbf: now,
            exp: now + ttl,
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            dt: serde_json::to_string(settings)?,
        };
        self.seal(&claims)
    }

    /// Open a token and return the settings it carries
    pub fn decode(&self, raw: &str, now: DateTime<Utc>) -> TokenResult<Vec<SettingModel>> {
        let claims = self.open(raw, now)?;
        Ok(serde_json::from_str(&claims.dt)?)
    }

    /// Seal arbitrary claims
    pub fn seal(&self, claims: &TokenClaims) -> TokenResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| TokenError::Crypto("failed to generate nonce".to_string()))?;

        let footer = self.footer.as_deref().unwrap_or_default();
        let aad = associated_data(footer);

        let mut in_out = serde_json::to_vec(claims)?;
        self.key
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::from(aad.as_slice()), &mut in_out)
            .map_err(|_| TokenError::Crypto("seal operation failed".to_string()))?;

        let mut body = Vec::with_capacity(NONCE_SIZE + in_out.len());
        body.extend_from_slice(&nonce_bytes);
        body.extend_from_slice(&in_out);

        let mut token = format!("{}{}", HEADER, URL_SAFE_NO_PAD.encode(&body));
        if !footer.is_empty() {
            token.push('.');
            token.push_str(&URL_SAFE_NO_PAD.encode(footer));
        }
        Ok(token)
    }

    /// Open a token and validate its claims against `now`
    pub fn open(&self, raw: &str, now: DateTime<Utc>) -> TokenResult<TokenClaims> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(TokenError::Malformed(format!("expected 3 or 4 segments, found {}", parts.len())));
        }
        if parts[0] != VERSION || parts[1] != PURPOSE {
            return Err(TokenError::UnsupportedVersion(format!("{}.{}", parts[0], parts[1])));
        }

        let body = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| TokenError::Malformed("payload is not base64url".to_string()))?;

        let footer = match parts.get(3) {
            Some(encoded) => {
                let bytes = URL_SAFE_NO_PAD
                    .decode(encoded)
                    .map_err(|_| TokenError::Malformed("footer is not base64url".to_string()))?;
                String::from_utf8(bytes).map_err(|_| TokenError::Malformed("footer is not UTF-8".to_string()))?
            }
            None => String::new(),
        };
        if let Some(expected) = &self.footer {
            if *expected != footer {
                return Err(TokenError::FooterMismatch);
            }
        }

        if body.len() < NONCE_SIZE + aead::CHACHA20_POLY1305.tag_len() {
            return Err(TokenError::Malformed("payload too short".to_string()));
        }

        let (nonce_bytes, sealed) = body.split_at(NONCE_SIZE);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| TokenError::Malformed("invalid nonce".to_string()))?;

        let aad = associated_data(&footer);
        let mut in_out = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad.as_slice()), &mut in_out)
            .map_err(|_| TokenError::Authentication)?;

        let claims: TokenClaims =
            serde_json::from_slice(plaintext).map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        self.validate(&claims, now)?;
        Ok(claims)
    }

    fn validate(&self, claims: &TokenClaims, now: DateTime<Utc>) -> TokenResult<()> {
        if claims.iss != self.issuer {
            return Err(TokenError::IssuerMismatch {
                expected: self.issuer.clone(),
                found: claims.iss.clone(),
            });
        }
        if claims.sub != self.subject {
            return Err(TokenError::SubjectMismatch {
                expected: self.subject.clone(),
                found: claims.sub.clone(),
            });
        }
        if now > claims.exp {
            return Err(TokenError::Expired(claims.exp));
        }
        if now < claims.nbf {
            return Err(TokenError::NotYetValid(claims.nbf));
        }
        Ok(())
    }
}

fn associated_data(footer: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(HEADER.len() + footer.len());
    aad.extend_from_slice(HEADER.as_bytes());
    aad.extend_from_slice(footer.as_bytes());
    aad
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("subject", &self.subject)
            .field("footer", &self.footer)
            .finish()
    }
}
