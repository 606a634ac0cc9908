//! RS256 bearer credential verification.
//!
//! Verification runs in this order:
//! 1. Bearer scheme extraction
//! 2. Token decoding and algorithm check
//! 3. Signature verification against the trusted key
//! 4. Subject, issuer, time bounds and audience checks
//! 5. Optional profile enrichment

use std::{fmt, sync::Arc};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::{
    AudienceEnforcement, Claims, CredentialError, HttpProfileSource, ProfileSource, TrustedKey,
    VerifierConfig, claims::Payload,
};

/// The only accepted signing algorithm.
pub const ALGORITHM: &str = "RS256";

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// Verifies bearer credentials and produces their [`Claims`].
///
/// A verifier is immutable after construction and can be shared across
/// concurrent requests.
#[derive(Clone)]
pub struct CredentialVerifier {
    config: VerifierConfig,
    key: Option<TrustedKey>,
    profiles: Option<Arc<dyn ProfileSource>>,
}

impl CredentialVerifier {
    /// Create a verifier from `config`.
    ///
    /// Profile enrichment is enabled when the configuration names a
    /// profile endpoint. A configuration without a key is accepted, but
    /// every credential will then be rejected with
    /// [`CredentialError::MissingKey`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidKey`] if the configured key cannot
    /// be read.
    pub fn new(config: VerifierConfig) -> Result<Self, CredentialError> {
        let key = match config.public_key.as_deref().map(str::trim) {
            Some(pem) if !pem.is_empty() => Some(TrustedKey::from_pem(pem)?),
            _ => {
                warn!(
                    "No trusted signing key is configured; all credentials will be rejected"
                );
                None
            }
        };

        let profiles = config.profile_endpoint.clone().map(|endpoint| {
            let source = HttpProfileSource::new(endpoint, config.profile_timeout);
            Arc::new(source) as Arc<dyn ProfileSource>
        });

        Ok(Self {
            config,
            key,
            profiles,
        })
    }

    /// Replace the trusted key.
    pub fn with_key(mut self, key: TrustedKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Replace the profile source used for enrichment.
    pub fn with_profile_source(mut self, source: impl ProfileSource + 'static) -> Self {
        self.profiles = Some(Arc::new(source));
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify the credential carried in an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] describing the first failed check.
    /// Profile enrichment failures are logged and never returned.
    pub async fn verify(&self, authorization: Option<&str>) -> Result<Claims, CredentialError> {
        self.verify_at(authorization, unix_now()).await
    }

    /// [`CredentialVerifier::verify`] with an explicit current time, in unix
    /// seconds.
    pub async fn verify_at(
        &self,
        authorization: Option<&str>,
        now: u64,
    ) -> Result<Claims, CredentialError> {
        let token = bearer_token(authorization, self.config.max_header_bytes)?;
        let claims = self.verify_token_at(token, now)?;
        Ok(self.enrich(token, claims).await)
    }

    /// Verify a bare token, without the scheme prefix and without profile
    /// enrichment.
    pub fn verify_token(&self, token: &str) -> Result<Claims, CredentialError> {
        self.verify_token_at(token, unix_now())
    }

    /// [`CredentialVerifier::verify_token`] with an explicit current time, in
    /// unix seconds.
    pub fn verify_token_at(&self, token: &str, now: u64) -> Result<Claims, CredentialError> {
        let key = self.key.as_ref().ok_or(CredentialError::MissingKey)?;

        let segments: Vec<&str> = token.split('.').collect();
        let &[header_segment, payload_segment, signature_segment] = segments.as_slice() else {
            return Err(CredentialError::Malformed(
                "expected three dot-separated segments".into(),
            ));
        };

        let header: Header = decode_json(header_segment, "header")?;
        if header.alg != ALGORITHM {
            return Err(CredentialError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_segment)
            .map_err(|error| CredentialError::Malformed(format!("signature: {error}")))?;
        let signing_input = &token[..header_segment.len() + 1 + payload_segment.len()];
        key.verify(signing_input.as_bytes(), &signature)?;

        let payload: Payload = decode_json(payload_segment, "payload")?;
        let claims = Claims::from_payload(payload);
        self.check_claims(&claims, now)?;

        debug!(subject = claims.subject(), "Credential verified");
        Ok(claims)
    }

    fn check_claims(&self, claims: &Claims, now: u64) -> Result<(), CredentialError> {
        if claims.subject().is_empty() {
            return Err(CredentialError::MissingSubject);
        }

        if claims.issuer() != self.config.issuer {
            return Err(CredentialError::IssuerMismatch {
                expected: self.config.issuer.clone(),
                got: claims.issuer().to_string(),
            });
        }

        if now >= claims.expires_at() {
            return Err(CredentialError::Expired);
        }

        if let Some(not_before) = claims.not_before() {
            if now < not_before {
                return Err(CredentialError::NotYetValid);
            }
        }

        let expected = &self.config.audience;
        if claims
            .audience()
            .is_some_and(|audience| audience.contains(expected))
        {
            return Ok(());
        }

        let got = claims
            .audience()
            .map(ToString::to_string)
            .unwrap_or_default();
        match self.config.audience_enforcement {
            AudienceEnforcement::Strict => Err(CredentialError::AudienceMismatch {
                expected: expected.clone(),
                got,
            }),
            AudienceEnforcement::Relaxed => {
                warn!(%expected, %got, "Audience mismatch ignored");
                Ok(())
            }
        }
    }

    async fn enrich(&self, token: &str, claims: Claims) -> Claims {
        let Some(profiles) = &self.profiles else {
            return claims;
        };
        if !claims.needs_profile() {
            return claims;
        }

        match profiles.fetch_profile(token).await {
            Ok(profile) => claims.with_profile(profile),
            Err(error) => {
                warn!(%error, subject = claims.subject(), "Profile enrichment failed");
                claims
            }
        }
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("config", &self.config)
            .field("key", &self.key)
            .field("profiles", &self.profiles.is_some())
            .finish()
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively and surrounding whitespace is
/// ignored.
///
/// # Errors
///
/// Returns [`CredentialError::MissingCredential`] for an absent or empty
/// header or token, [`CredentialError::HeaderTooLarge`] when the header
/// exceeds `limit` bytes and [`CredentialError::UnsupportedScheme`] for any
/// scheme other than `Bearer`.
pub fn bearer_token(authorization: Option<&str>, limit: usize) -> Result<&str, CredentialError> {
    let header = authorization.ok_or(CredentialError::MissingCredential)?;
    if header.len() > limit {
        return Err(CredentialError::HeaderTooLarge {
            size: header.len(),
            limit,
        });
    }

    let header = header.trim();
    if header.is_empty() {
        return Err(CredentialError::MissingCredential);
    }

    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(CredentialError::UnsupportedScheme);
    }
    if token.is_empty() {
        return Err(CredentialError::MissingCredential);
    }
    Ok(token)
}

/// The current time in unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn decode_json<T: DeserializeOwned>(segment: &str, part: &str) -> Result<T, CredentialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|error| CredentialError::Malformed(format!("{part}: {error}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|error| CredentialError::Malformed(format!("{part}: {error}")))
}
