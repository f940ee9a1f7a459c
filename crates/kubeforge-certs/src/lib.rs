//! Key material for new clusters: a self-signed certificate authority (CA)
//! which the cluster components derive their certificates from, and the SSH
//! key pair used to log into the cluster machines.
//!
//! ## Feature Flags
//!
//! - `insecure-test-keys`: generates 512 bit RSA keys instead of 4096 bit
//!   ones. Key generation is slow, so dependent crates enable this for their
//!   tests. Never enable it for production builds.
//!
//! ## References
//!
//! - <https://datatracker.ietf.org/doc/html/rfc5280>
//! - <https://datatracker.ietf.org/doc/html/rfc4253#section-6.6>
use snafu::{ResultExt, Snafu};
use x509_cert::{
    Certificate,
    der::{EncodePem, pem::LineEnding},
    spki::EncodePublicKey,
};
use zeroize::Zeroizing;

use crate::keys::CertificateKeypair;

pub mod ca;
pub mod keys;
pub mod ssh;

/// All PEM documents are written with Unix line endings.
pub const PEM_LINE_ENDING: LineEnding = LineEnding::LF;

#[derive(Debug, Snafu)]
pub enum CertificatePairError {
    #[snafu(display("failed to serialize certificate as PEM"))]
    SerializeCertificate { source: x509_cert::der::Error },

    #[snafu(display("failed to serialize private key as PKCS8 PEM"))]
    SerializePrivateKey { source: rsa::pkcs8::Error },
}

/// Contains the certificate and the signing / embedded key pair.
///
/// A [`CertificateAuthority`](crate::ca::CertificateAuthority) uses this
/// struct to store the key pair which signed the CA itself (self-signed).
#[derive(Debug)]
pub struct CertificatePair<S>
where
    S: CertificateKeypair,
    <S::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    certificate: Certificate,
    key_pair: S,
}

impl<S> CertificatePair<S>
where
    S: CertificateKeypair,
    <S::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn key_pair(&self) -> &S {
        &self.key_pair
    }

    pub fn certificate_pem(&self) -> Result<String, CertificatePairError> {
        self.certificate
            .to_pem(PEM_LINE_ENDING)
            .context(SerializeCertificateSnafu)
    }

    /// Returns the private key as PEM-encoded PKCS8 document.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CertificatePairError> {
        use rsa::pkcs8::EncodePrivateKey;

        self.key_pair
            .signing_key()
            .to_pkcs8_pem(PEM_LINE_ENDING)
            .context(SerializePrivateKeySnafu)
    }
}
