//! SSH key pairs for logging into cluster machines.
//!
//! The private key is stored as PEM-encoded PKCS#1 document, which every
//! OpenSSH version accepts. The public key is rendered in the
//! `authorized_keys` format described in RFC 4253, section 6.6.
use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use rand_core::{CryptoRngCore, OsRng};
use rsa::{RsaPrivateKey, pkcs1::EncodeRsaPrivateKey, traits::PublicKeyParts};
use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::{PEM_LINE_ENDING, keys::rsa as rsa_keys};

pub const SSH_RSA_ALGORITHM: &str = "ssh-rsa";

/// Private keys are only readable by their owner, OpenSSH refuses to use
/// them otherwise.
#[cfg(unix)]
const PRIVATE_KEY_MODE: u32 = 0o600;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to generate SSH key"))]
    GenerateKey { source: rsa_keys::Error },

    #[snafu(display("failed to encode SSH private key as PKCS#1 PEM"))]
    EncodePrivateKey { source: rsa::pkcs1::Error },

    #[snafu(display("failed to write SSH private key to {path:?}"))]
    WritePrivateKey {
        source: std::io::Error,
        path: PathBuf,
    },
}

#[derive(Debug)]
pub struct SshKeyPair {
    private_key: RsaPrivateKey,
}

impl SshKeyPair {
    #[instrument(name = "create_ssh_key_pair")]
    pub fn new() -> Result<Self> {
        Self::new_with_rng(&mut OsRng)
    }

    #[instrument(name = "create_ssh_key_pair_custom_rng", skip_all)]
    pub fn new_with_rng<Rng>(rng: &mut Rng) -> Result<Self>
    where
        Rng: CryptoRngCore + ?Sized,
    {
        let private_key = rsa_keys::generate_private_key(rng).context(GenerateKeySnafu)?;
        Ok(Self { private_key })
    }

    /// Returns the public key as single `authorized_keys` line without
    /// comment, e.g. `ssh-rsa AAAAB3NzaC1yc2E...`.
    pub fn authorized_key(&self) -> String {
        let mut blob = Vec::new();
        write_string(&mut blob, SSH_RSA_ALGORITHM.as_bytes());
        write_mpint(&mut blob, &self.private_key.e().to_bytes_be());
        write_mpint(&mut blob, &self.private_key.n().to_bytes_be());

        format!("{SSH_RSA_ALGORITHM} {}", STANDARD.encode(blob))
    }

    pub fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.private_key
            .to_pkcs1_pem(PEM_LINE_ENDING)
            .context(EncodePrivateKeySnafu)
    }

    /// Writes the private key to `path`, replacing an existing file. On Unix
    /// the file is only accessible by its owner.
    #[instrument(skip(self))]
    pub fn write_private_key(&self, path: &Path) -> Result<()> {
        let pem = self.private_key_pem()?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, PRIVATE_KEY_MODE);

        let mut file = options.open(path).context(WritePrivateKeySnafu { path })?;
        file.write_all(pem.as_bytes())
            .context(WritePrivateKeySnafu { path })?;

        // The mode passed to open only applies to newly created files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(PRIVATE_KEY_MODE))
                .context(WritePrivateKeySnafu { path })?;
        }

        debug!("wrote SSH private key");
        Ok(())
    }
}

fn write_string(buffer: &mut Vec<u8>, bytes: &[u8]) {
    buffer.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buffer.extend_from_slice(bytes);
}

/// Encodes a non-negative big-endian integer as SSH `mpint`, which needs a
/// leading zero byte if the most significant bit is set.
fn write_mpint(buffer: &mut Vec<u8>, bytes: &[u8]) {
    let start = bytes.iter().position(|byte| *byte != 0).unwrap_or(bytes.len());
    let bytes = &bytes[start..];
    let needs_padding = bytes.first().is_some_and(|byte| byte & 0x80 != 0);

    buffer.extend_from_slice(&((bytes.len() + usize::from(needs_padding)) as u32).to_be_bytes());
    if needs_padding {
        buffer.push(0);
    }
    buffer.extend_from_slice(bytes);
}
