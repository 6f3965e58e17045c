use std::fmt;

use anyhow::{Context, Result, bail};
use log::debug;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{self, DecodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, PrivateKeyInfo, SecretDocument};
use rsa::traits::PublicKeyParts;

use crate::error::KeyError;

/// Which structure the input DER turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Pkcs8,
    Pkcs1,
}

impl fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEncoding::Pkcs8 => f.write_str("PKCS#8"),
            KeyEncoding::Pkcs1 => f.write_str("PKCS#1"),
        }
    }
}

/// An RSA key re-encoded as canonical PKCS#8 DER.
pub struct Pkcs8Key {
    encoding: KeyEncoding,
    modulus_bits: usize,
    der: SecretDocument,
}

impl Pkcs8Key {
    /// Encoding the key was found in before normalization.
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    pub fn der(&self) -> &[u8] {
        self.der.as_bytes()
    }
}

/// Tries PKCS#8 first, then PKCS#1, and returns the first RSA key found.
///
/// A well-formed PKCS#8 structure holding a non-RSA key is rejected
/// outright rather than retried as PKCS#1.
pub fn decode_rsa(der: &[u8]) -> Result<(KeyEncoding, RsaPrivateKey)> {
    let pkcs8_err = match PrivateKeyInfo::try_from(der) {
        Ok(info) if info.algorithm.oid != pkcs1::ALGORITHM_OID => {
            bail!(KeyError::UnsupportedAlgorithm(info.algorithm.oid.to_string()))
        }
        Ok(_) => match RsaPrivateKey::from_pkcs8_der(der) {
            Ok(key) => return Ok((KeyEncoding::Pkcs8, key)),
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };

    match RsaPrivateKey::from_pkcs1_der(der) {
        Ok(key) => Ok((KeyEncoding::Pkcs1, key)),
        Err(e) => bail!(KeyError::UnrecognizedKey {
            pkcs8: pkcs8_err,
            pkcs1: e.to_string(),
        }),
    }
}

/// Decodes a PKCS#1 or PKCS#8 RSA key and re-encodes it as PKCS#8.
pub fn normalize(der: &[u8]) -> Result<Pkcs8Key> {
    let (encoding, key) = decode_rsa(der)?;
    let modulus_bits = key.n().bits();
    debug!("decoded {modulus_bits}-bit RSA key from {encoding}");

    let der = key
        .to_pkcs8_der()
        .context("failed to encode key as PKCS#8")?;

    Ok(Pkcs8Key {
        encoding,
        modulus_bits,
        der,
    })
}
