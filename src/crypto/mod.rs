//! Legacy PEM encryption (`Proc-Type: 4,ENCRYPTED` / `DEK-Info`).
//!
//! This is the pre-PKCS#8 OpenSSL scheme: an MD5 based key derivation with a
//! single round and CBC with PKCS#7 padding. It exists only so the output can
//! be read by consumers that still call Go's `x509.DecryptPEMBlock` and the
//! like. Do not use it to protect anything new.

pub mod cipher;
pub mod header;
pub mod kdf;

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use log::debug;
use pem::Pem;
use zeroize::Zeroizing;

use crate::error::KeyError;
pub use header::DekInfo;

/// Number of IV bytes used as the key derivation salt.
pub const SALT_LEN: usize = 8;
/// Length of an MD5 digest.
pub const MD5_LEN: usize = 16;

/// Block ciphers understood in a `DEK-Info` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PemCipher {
    Des,
    #[default]
    TripleDes,
    Aes128,
    Aes192,
    Aes256,
}

impl PemCipher {
    pub const ALL: [PemCipher; 5] = [
        PemCipher::Des,
        PemCipher::TripleDes,
        PemCipher::Aes128,
        PemCipher::Aes192,
        PemCipher::Aes256,
    ];

    /// Name as written in the `DEK-Info` header.
    pub fn name(&self) -> &'static str {
        match self {
            PemCipher::Des => "DES-CBC",
            PemCipher::TripleDes => "DES-EDE3-CBC",
            PemCipher::Aes128 => "AES-128-CBC",
            PemCipher::Aes192 => "AES-192-CBC",
            PemCipher::Aes256 => "AES-256-CBC",
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            PemCipher::Des => 8,
            PemCipher::TripleDes => 24,
            PemCipher::Aes128 => 16,
            PemCipher::Aes192 => 24,
            PemCipher::Aes256 => 32,
        }
    }

    /// Block size, which is also the IV length.
    pub fn block_len(&self) -> usize {
        match self {
            PemCipher::Des | PemCipher::TripleDes => 8,
            PemCipher::Aes128 | PemCipher::Aes192 | PemCipher::Aes256 => 16,
        }
    }
}

impl fmt::Display for PemCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PemCipher {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PemCipher::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KeyError::UnknownCipher(s.to_string()))
    }
}

/// Encrypts `der` under `password` and wraps it in a PEM block labelled
/// `label` carrying the `Proc-Type` and `DEK-Info` headers.
///
/// # Errors
///
/// Returns an error if the OS random generator fails or the cipher
/// cannot be initialised.
pub fn encrypt_legacy_pem(
    label: &str,
    der: &[u8],
    password: &[u8],
    pem_cipher: PemCipher,
) -> Result<Pem> {
    let iv = cipher::generate_iv(pem_cipher)?;
    let dek = DekInfo::new(pem_cipher, iv)?;
    let key = kdf::derive_key(password, dek.salt(), pem_cipher.key_len());

    let ciphertext = cipher::encrypt(pem_cipher, &key, dek.iv(), der)?;
    debug!("encrypted {} bytes of {label} with {pem_cipher}", der.len());

    let mut block = Pem::new(label, ciphertext);
    dek.write_headers(&mut block)
        .context("failed to attach PEM encryption headers")?;
    Ok(block)
}

/// Decrypts a block produced by [`encrypt_legacy_pem`] (or by
/// `openssl rsa -traditional -des3` and friends).
///
/// # Errors
///
/// Returns an error if the block is not encrypted, its headers are
/// malformed, or the password is wrong.
pub fn decrypt_legacy_pem(block: &Pem, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if !header::is_encrypted(block) {
        bail!(KeyError::MalformedHeader(format!(
            "{} block has no 'Proc-Type: 4,ENCRYPTED' header",
            block.tag()
        )));
    }

    let dek = DekInfo::from_pem(block)?;
    let key = kdf::derive_key(password, dek.salt(), dek.cipher().key_len());
    cipher::decrypt(dek.cipher(), &key, dek.iv(), block.contents())
}
