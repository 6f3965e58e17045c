use md5::{Digest, Md5};
use zeroize::Zeroizing;

use super::MD5_LEN;

/// OpenSSL's `EVP_BytesToKey` with MD5 and a single iteration.
///
/// `D_1 = MD5(password || salt)`, `D_n = MD5(D_{n-1} || password || salt)`,
/// concatenated until `key_len` bytes are available.
pub fn derive_key(password: &[u8], salt: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(Vec::with_capacity(key_len + MD5_LEN));
    let mut digest = Zeroizing::new([0u8; MD5_LEN]);
    let mut first = true;

    while key.len() < key_len {
        let mut hasher = Md5::new();
        if !first {
            hasher.update(*digest);
        }
        hasher.update(password);
        hasher.update(salt);
        digest.copy_from_slice(&hasher.finalize());
        key.extend_from_slice(&*digest);
        first = false;
    }

    key.truncate(key_len);
    key
}
