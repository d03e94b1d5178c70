use crate::domain::security::{PasswordEncoder, TokenClaims, TokenIssuer};
use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

// Argon2 parameters for 50-150ms target latency
const ARGON2_M_COST: u32 = 19456; // 19 MB
const ARGON2_T_COST: u32 = 2; // 2 iterations
const ARGON2_P_COST: u32 = 1; // 1 parallelism

// Well-formed hash with the parameters above; verifying against it costs a
// full Argon2 run and never succeeds in practice.
const TIMING_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nc2FmZWd1YXJkIQ$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const TOKEN_LEEWAY_SECS: u64 = 60;

/// Argon2id hashing producing PHC strings (`$argon2id$v=19$...`).
#[derive(Clone)]
pub struct Argon2PasswordEncoder {
    argon2: Argon2<'static>,
}

impl Argon2PasswordEncoder {
    pub fn new() -> Result<Self> {
        let params = argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
            .map_err(|e| anyhow!("Invalid Argon2 parameters: {}", e))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
        Ok(password_hash.to_string())
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(encoded_password) else {
            trace!("Stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(raw_password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn simulate_matches(&self, raw_password: &str) {
        let _ = self.matches(raw_password, TIMING_HASH);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    #[serde(flatten)]
    extra: TokenClaims,
}

/// A token that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub subject: String,
    pub claims: TokenClaims,
}

/// HS256 JWT issuer and verifier sharing one secret.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtTokenIssuer {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = TOKEN_LEEWAY_SECS;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(VerifiedToken {
            subject: token_data.claims.sub,
            claims: token_data.claims.extra,
        })
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn generate_token(&self, subject: &str, claims: &TokenClaims) -> Result<String> {
        let now = Utc::now().timestamp();

        // Reserved names always come from the issuer.
        let mut extra = claims.clone();
        for reserved in ["sub", "exp", "iat"] {
            extra.remove(reserved);
        }

        let claims = Claims {
            sub: subject.to_string(),
            exp: now + self.ttl_secs,
            iat: now,
            extra,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}
