//! Trusted RS256 verification keys.

use std::{borrow::Cow, fmt};

use rsa::{
    RsaPublicKey,
    pkcs1::DecodeRsaPublicKey,
    pkcs1v15::{Signature, VerifyingKey},
    pkcs8::DecodePublicKey,
    signature::Verifier,
};
use sha2::Sha256;
use x509_cert::{
    Certificate,
    der::{DecodePem, Encode},
};

use crate::CredentialError;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
const RSA_PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";

/// Turn literal `\n` escape sequences into line breaks.
///
/// Key material read from environment variables often arrives on one line
/// with escaped line breaks. Text that already contains a real line break is
/// returned as is, so normalizing twice changes nothing.
pub fn normalize_key_material(raw: &str) -> Cow<'_, str> {
    if raw.contains('\n') || !raw.contains("\\n") {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(raw.replace("\\n", "\n"))
    }
}

/// An RSA public key trusted to sign credentials with RS256.
#[derive(Clone)]
pub struct TrustedKey {
    key: VerifyingKey<Sha256>,
}

impl TrustedKey {
    /// Read a key from PEM text.
    ///
    /// Accepts an X.509 `CERTIFICATE`, a SubjectPublicKeyInfo `PUBLIC KEY`
    /// or a PKCS#1 `RSA PUBLIC KEY`. Escaped line breaks are normalized
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingKey`] for blank input and
    /// [`CredentialError::InvalidKey`] when the text cannot be read as an
    /// RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, CredentialError> {
        let pem = normalize_key_material(pem.trim());
        if pem.is_empty() {
            return Err(CredentialError::MissingKey);
        }

        let public_key = match pem_label(&pem) {
            Some(CERTIFICATE_LABEL) => {
                let certificate = Certificate::from_pem(pem.as_bytes()).map_err(invalid_key)?;
                let spki = certificate
                    .tbs_certificate
                    .subject_public_key_info
                    .to_der()
                    .map_err(invalid_key)?;
                RsaPublicKey::from_public_key_der(&spki).map_err(invalid_key)?
            }
            Some(PUBLIC_KEY_LABEL) => RsaPublicKey::from_public_key_pem(&pem).map_err(invalid_key)?,
            Some(RSA_PUBLIC_KEY_LABEL) => RsaPublicKey::from_pkcs1_pem(&pem).map_err(invalid_key)?,
            Some(label) => {
                return Err(CredentialError::InvalidKey(format!(
                    "Unsupported PEM label {label}"
                )));
            }
            None => return Err(CredentialError::InvalidKey("Not a PEM document".into())),
        };

        Ok(Self::from(public_key))
    }

    /// Check an RS256 `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidSignature`] if the signature is
    /// malformed or does not match.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CredentialError> {
        let signature =
            Signature::try_from(signature).map_err(|_| CredentialError::InvalidSignature)?;
        self.key
            .verify(message, &signature)
            .map_err(|_| CredentialError::InvalidSignature)
    }
}

impl From<RsaPublicKey> for TrustedKey {
    fn from(public_key: RsaPublicKey) -> Self {
        Self {
            key: VerifyingKey::new(public_key),
        }
    }
}

impl fmt::Debug for TrustedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedKey").finish_non_exhaustive()
    }
}

fn pem_label(pem: &str) -> Option<&str> {
    let rest = pem.strip_prefix("-----BEGIN ")?;
    let end = rest.find("-----")?;
    Some(&rest[..end])
}

fn invalid_key(error: impl fmt::Display) -> CredentialError {
    CredentialError::InvalidKey(error.to_string())
}
