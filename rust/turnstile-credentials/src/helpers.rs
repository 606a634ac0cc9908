//! Fixtures for issuing test credentials.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{
    RsaPrivateKey,
    pkcs1v15::SigningKey,
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer},
};
use serde_json::{Value, json};
use sha2::Sha256;

use crate::{VerifierConfig, unix_now};

/// Self-signed certificate of the fixture signing key.
pub const TEST_CERTIFICATE: &str = include_str!("../tests/fixtures/certificate.pem");

/// SubjectPublicKeyInfo PEM of the fixture signing key.
pub const TEST_PUBLIC_KEY: &str = include_str!("../tests/fixtures/public-key.pem");

/// PKCS#1 PEM of the fixture signing key.
pub const TEST_RSA_PUBLIC_KEY: &str = include_str!("../tests/fixtures/rsa-public-key.pem");

/// PKCS#8 PEM of the fixture signing key.
pub const TEST_SIGNING_KEY: &str = include_str!("../tests/fixtures/signing-key.pem");

/// Tenant domain the fixture tokens are issued by.
pub const TEST_DOMAIN: &str = "tenant.turnstile.test";

/// Audience the fixture tokens are addressed to.
pub const TEST_AUDIENCE: &str = "https://api.turnstile.test";

/// Signs RS256 tokens for tests.
#[derive(Clone)]
pub struct TokenIssuer {
    key: SigningKey<Sha256>,
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenIssuer {
    /// An issuer holding the fixture signing key.
    pub fn new() -> Self {
        let key = RsaPrivateKey::from_pkcs8_pem(TEST_SIGNING_KEY).expect("valid fixture key");
        Self::from(key)
    }

    /// An issuer holding a freshly generated key nobody trusts.
    pub fn generate() -> Self {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("key generation");
        Self::from(key)
    }

    /// Sign raw bytes.
    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_vec()
    }

    /// Sign `claims` under a standard RS256 header.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(&json!({ "alg": "RS256", "typ": "JWT" }), claims)
    }

    /// Sign `claims` under an arbitrary `header`.
    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign_bytes(signing_input.as_bytes()));
        format!("{signing_input}.{signature}")
    }
}

impl From<RsaPrivateKey> for TokenIssuer {
    fn from(key: RsaPrivateKey) -> Self {
        Self {
            key: SigningKey::new(key),
        }
    }
}

/// Claims for `subject` that pass verification under
/// [`test_verifier_config`] for the next hour.
pub fn test_claims(subject: &str) -> Value {
    let now = unix_now();
    json!({
        "sub": subject,
        "iss": format!("https://{TEST_DOMAIN}/"),
        "aud": TEST_AUDIENCE,
        "iat": now,
        "exp": now + 3600,
    })
}

/// A verifier configuration trusting the fixture key.
pub fn test_verifier_config() -> VerifierConfig {
    VerifierConfig::for_domain(TEST_DOMAIN, TEST_AUDIENCE).with_public_key(TEST_PUBLIC_KEY)
}
