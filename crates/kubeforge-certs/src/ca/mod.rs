//! Contains types and functions to generate self-signed certificate
//! authorities (CAs).
use x509_cert::{Certificate, name::RdnSequence, spki::EncodePublicKey};
use zeroize::Zeroizing;

use crate::{
    CertificatePair, CertificatePairError,
    keys::{CertificateKeypair, rsa},
};

mod ca_builder;
mod consts;
pub use ca_builder::*;
pub use consts::*;

/// A self-signed certificate authority (CA).
///
/// Use [`CertificateAuthorityBuilder`] to create new CAs.
#[derive(Debug)]
pub struct CertificateAuthority<SK>
where
    SK: CertificateKeypair,
    <SK::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    certificate_pair: CertificatePair<SK>,
}

impl<SK> CertificateAuthority<SK>
where
    SK: CertificateKeypair,
    <SK::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    pub fn builder() -> CertificateAuthorityBuilderBuilder<'static, SK> {
        CertificateAuthorityBuilder::start_builder()
    }

    pub fn signing_key(&self) -> &SK::SigningKey {
        self.certificate_pair.key_pair().signing_key()
    }

    pub fn ca_cert(&self) -> &Certificate {
        self.certificate_pair.certificate()
    }

    pub fn issuer_name(&self) -> &RdnSequence {
        &self.ca_cert().tbs_certificate.issuer
    }

    pub fn ca_cert_pem(&self) -> Result<String, CertificatePairError> {
        self.certificate_pair.certificate_pem()
    }

    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CertificatePairError> {
        self.certificate_pair.private_key_pem()
    }
}

impl CertificateAuthority<rsa::SigningKey> {
    /// Same as [`Self::builder`], but enforces the RSA algorithm for key creation.
    pub fn builder_with_rsa() -> CertificateAuthorityBuilderBuilder<'static, rsa::SigningKey> {
        Self::builder()
    }
}
