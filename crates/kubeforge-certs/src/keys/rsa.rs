//! RSA signing keys, see [`SigningKey`].
use rand_core::{CryptoRngCore, OsRng};
use rsa::{RsaPrivateKey, pkcs8::DecodePrivateKey};
use signature::Keypair;
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::keys::CertificateKeypair;

#[cfg(not(any(test, feature = "insecure-test-keys")))]
pub const KEY_SIZE: usize = 4096;

#[cfg(any(test, feature = "insecure-test-keys"))]
pub const KEY_SIZE: usize = 512;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("failed to create RSA key"))]
    CreateKey { source: rsa::Error },

    #[snafu(display("failed to deserialize the signing (private) key from PEM-encoded PKCS8"))]
    DeserializeSigningKey { source: rsa::pkcs8::Error },
}

/// Generates a bare RSA private key of [`KEY_SIZE`] bits.
///
/// Generating `4096` bit keys can take multiple seconds.
#[instrument(name = "create_rsa_private_key", skip_all)]
pub fn generate_private_key<Rng>(rng: &mut Rng) -> Result<RsaPrivateKey>
where
    Rng: CryptoRngCore + ?Sized,
{
    RsaPrivateKey::new(rng, KEY_SIZE).context(CreateKeySnafu)
}

#[derive(Debug)]
pub struct SigningKey(rsa::pkcs1v15::SigningKey<sha2::Sha256>);

impl CertificateKeypair for SigningKey {
    type Error = Error;
    type Signature = rsa::pkcs1v15::Signature;
    type SigningKey = rsa::pkcs1v15::SigningKey<sha2::Sha256>;
    type VerifyingKey = rsa::pkcs1v15::VerifyingKey<sha2::Sha256>;

    #[instrument(name = "create_rsa_signing_key")]
    fn new() -> Result<Self> {
        Self::new_with_rng(&mut OsRng)
    }

    #[instrument(name = "create_rsa_signing_key_custom_rng", skip_all)]
    fn new_with_rng<Rng>(rng: &mut Rng) -> Result<Self>
    where
        Rng: CryptoRngCore + Sized,
    {
        let private_key = generate_private_key(rng)?;
        Ok(Self(rsa::pkcs1v15::SigningKey::new(private_key)))
    }

    fn signing_key(&self) -> &Self::SigningKey {
        &self.0
    }

    fn verifying_key(&self) -> Self::VerifyingKey {
        self.0.verifying_key()
    }

    #[instrument(name = "create_rsa_signing_key_from_pkcs8_pem", skip_all)]
    fn from_pkcs8_pem(input: &str) -> Result<Self> {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(input).context(DeserializeSigningKeySnafu)?;
        Ok(Self(rsa::pkcs1v15::SigningKey::new(private_key)))
    }

    fn algorithm_name() -> &'static str {
        "rsa"
    }

    fn key_size() -> usize {
        KEY_SIZE
    }
}
