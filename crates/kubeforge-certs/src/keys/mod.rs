//! Private keys which sign the cluster CA.
//!
//! Cluster CAs are signed with RSA keys from the [`rsa`] crate, which every
//! component running on the cluster machines supports.
//!
//! ```no_run
//! use kubeforge_certs::keys::{CertificateKeypair, rsa::SigningKey};
//! let key = SigningKey::new().expect("failed to generate RSA key");
//! ```
//!
//! The [`rsa`] crate is affected by the Marvin attack, see
//! <https://rustsec.org/advisories/RUSTSEC-2023-0071.html>. Keys generated
//! here are only used for signing, never for decryption.
use std::fmt::Debug;

use ::rsa::pkcs8::EncodePrivateKey;
use rand_core::CryptoRngCore;
use signature::{Keypair, Signer};
use x509_cert::spki::{EncodePublicKey, SignatureAlgorithmIdentifier, SignatureBitStringEncoding};

pub mod rsa;

pub trait CertificateKeypair
where
    <Self::SigningKey as Keypair>::VerifyingKey: EncodePublicKey,
    Self: Debug + Sized,
{
    type SigningKey: SignatureAlgorithmIdentifier
        + Keypair
        + Signer<Self::Signature>
        + EncodePrivateKey;
    type Signature: SignatureBitStringEncoding;
    type VerifyingKey: EncodePublicKey;

    type Error: std::error::Error + 'static;

    /// Generates a new key with the default random-number generator
    /// [`rand_core::OsRng`].
    fn new() -> Result<Self, Self::Error>;

    /// Generates a new key with a custom random-number generator.
    fn new_with_rng<Rng>(rng: &mut Rng) -> Result<Self, Self::Error>
    where
        Rng: CryptoRngCore + Sized;

    fn signing_key(&self) -> &Self::SigningKey;

    fn verifying_key(&self) -> Self::VerifyingKey;

    /// Creates a signing key pair from the PEM-encoded private key.
    fn from_pkcs8_pem(input: &str) -> Result<Self, Self::Error>;

    /// The name of the algorithm, e.g. `rsa`.
    fn algorithm_name() -> &'static str;

    /// The key length in bits.
    fn key_size() -> usize;
}
