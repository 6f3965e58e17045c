//! Converts an unencrypted RSA private key (PKCS#1 or PKCS#8 PEM) into a
//! PKCS#8 key wrapped in legacy `Proc-Type`/`DEK-Info` PEM encryption.
//!
//! That combination is what the CT test harnesses (ct_hammer and friends)
//! parse. `openssl rsa -des3 -traditional` keeps the PKCS#1 body and
//! `openssl pkcs8 -topk8` drops the `DEK-Info` header, so neither produces it.

pub mod crypto;
mod error;
pub mod format;
pub mod key;
mod storage;

pub use crate::crypto::PemCipher;
pub use crate::error::KeyError;
pub use crate::key::KeyEncoding;
pub use crate::storage::KeyFile;
use anyhow::{Context, Result, bail};
use log::{debug, info};
use rsa::RsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use std::path::Path;
use zeroize::Zeroizing;

/// What a successful [`KeyNormalizer::normalize`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    input_label: String,
    encoding: KeyEncoding,
    modulus_bits: usize,
    cipher: PemCipher,
}

impl Normalized {
    /// PEM label of the input block.
    pub fn input_label(&self) -> &str {
        &self.input_label
    }

    /// Encoding the input key was found in.
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    pub fn cipher(&self) -> PemCipher {
        self.cipher
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyNormalizer {
    cipher: PemCipher,
}

impl KeyNormalizer {
    pub fn new(cipher: PemCipher) -> Self {
        Self { cipher }
    }

    pub fn cipher(&self) -> PemCipher {
        self.cipher
    }

    /// Reads `input`, normalizes the key and writes the encrypted
    /// `PRIVATE KEY` block to `output`.
    ///
    /// Nothing is written unless every earlier step succeeded.
    pub fn normalize(
        &self,
        input: &KeyFile,
        output: &KeyFile,
        password: &[u8],
    ) -> Result<Normalized> {
        let data = Zeroizing::new(input.load()?);
        let (normalized, text) = self.normalize_pem(&data, input.path(), password)?;

        output.save(text.as_bytes())?;
        info!(
            "wrote {} ({} {}-bit RSA) to {}",
            format::PRIVATE_KEY_LABEL,
            normalized.encoding,
            normalized.modulus_bits,
            output.path().display()
        );
        Ok(normalized)
    }

    /// In-memory half of [`normalize`](Self::normalize): returns the
    /// encrypted PEM text without touching the filesystem. `source` only
    /// names the input in errors.
    pub fn normalize_pem(
        &self,
        data: &[u8],
        source: &Path,
        password: &[u8],
    ) -> Result<(Normalized, String)> {
        let block = format::decode_first(data, source)?;
        if crypto::header::is_encrypted(&block) {
            bail!(KeyError::AlreadyEncrypted {
                path: source.to_path_buf(),
            });
        }
        debug!("{}: found {} block", source.display(), block.tag());

        let key = key::normalize(block.contents())
            .with_context(|| format!("failed to load key from {}", source.display()))?;

        let encrypted = crypto::encrypt_legacy_pem(
            format::PRIVATE_KEY_LABEL,
            key.der(),
            password,
            self.cipher,
        )?;

        let normalized = Normalized {
            input_label: block.tag().to_string(),
            encoding: key.encoding(),
            modulus_bits: key.modulus_bits(),
            cipher: self.cipher,
        };
        Ok((normalized, format::encode(&encrypted)))
    }
}

/// Reads a legacy-encrypted PKCS#8 key the way downstream CT tooling does:
/// decode the first PEM block, decrypt it with `password`, parse PKCS#8.
///
/// # Errors
///
/// Returns an error if the file is unreadable, not encrypted, the password
/// is wrong, or the plaintext is not a PKCS#8 RSA key.
pub fn decrypt_key_file(file: &KeyFile, password: &[u8]) -> Result<RsaPrivateKey> {
    let data = Zeroizing::new(file.load()?);
    let block = format::decode_first(&data, file.path())?;

    let der = crypto::decrypt_legacy_pem(&block, password)
        .with_context(|| format!("failed to decrypt {}", file.path().display()))?;
    let key = RsaPrivateKey::from_pkcs8_der(&der).map_err(|e| {
        anyhow::anyhow!(
            "decrypted {} is not a PKCS#8 RSA key ({e}); possibly wrong password",
            file.path().display()
        )
    })?;

    debug!("{}: recovered {}-bit RSA key", file.path().display(), key.n().bits());
    Ok(key)
}
