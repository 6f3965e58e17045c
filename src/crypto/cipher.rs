use super::PemCipher;
use crate::error::KeyError;
use aes::{Aes128, Aes192, Aes256};
use anyhow::{Result, bail};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use des::{Des, TdesEde3};
use getrandom::fill;
use zeroize::Zeroizing;

macro_rules! cbc_encrypt {
    ($block:ty, $key:expr, $iv:expr, $data:expr) => {
        cbc::Encryptor::<$block>::new_from_slices($key, $iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>($data))
            .map_err(|_| KeyError::Encrypt)?
    };
}

macro_rules! cbc_decrypt {
    ($block:ty, $key:expr, $iv:expr, $data:expr) => {
        cbc::Decryptor::<$block>::new_from_slices($key, $iv)
            .map_err(|_| KeyError::MalformedHeader("bad key or IV length".to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>($data)
            .map_err(|_| KeyError::IncorrectPassword)?
    };
}

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| KeyError::Random)?;
    Ok(())
}

/// Generate an IV sized to the cipher block
pub fn generate_iv(cipher: PemCipher) -> Result<Vec<u8>> {
    let mut iv = vec![0u8; cipher.block_len()];
    secure_random(&mut iv)?;
    Ok(iv)
}

/// Encrypt plaintext with PKCS#7 padding
pub fn encrypt(cipher: PemCipher, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let ciphertext = match cipher {
        PemCipher::Des => cbc_encrypt!(Des, key, iv, plaintext),
        PemCipher::TripleDes => cbc_encrypt!(TdesEde3, key, iv, plaintext),
        PemCipher::Aes128 => cbc_encrypt!(Aes128, key, iv, plaintext),
        PemCipher::Aes192 => cbc_encrypt!(Aes192, key, iv, plaintext),
        PemCipher::Aes256 => cbc_encrypt!(Aes256, key, iv, plaintext),
    };
    Ok(ciphertext)
}

/// Decrypt ciphertext and strip the padding
pub fn decrypt(
    cipher: PemCipher,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.is_empty() || ciphertext.len() % cipher.block_len() != 0 {
        bail!("encrypted PEM data is not a multiple of the {cipher} block size");
    }

    let plaintext = match cipher {
        PemCipher::Des => cbc_decrypt!(Des, key, iv, ciphertext),
        PemCipher::TripleDes => cbc_decrypt!(TdesEde3, key, iv, ciphertext),
        PemCipher::Aes128 => cbc_decrypt!(Aes128, key, iv, ciphertext),
        PemCipher::Aes192 => cbc_decrypt!(Aes192, key, iv, ciphertext),
        PemCipher::Aes256 => cbc_decrypt!(Aes256, key, iv, ciphertext),
    };
    Ok(Zeroizing::new(plaintext))
}
