use super::{PemCipher, SALT_LEN};
use crate::error::KeyError;
use anyhow::{Result, bail};
use pem::Pem;

pub const PROC_TYPE: &str = "Proc-Type";
pub const PROC_TYPE_ENCRYPTED: &str = "4,ENCRYPTED";
pub const DEK_INFO: &str = "DEK-Info";

/// Returns `true` if the block declares `Proc-Type: 4,ENCRYPTED`.
pub fn is_encrypted(block: &Pem) -> bool {
    block
        .headers()
        .get(PROC_TYPE)
        .is_some_and(|v| v.trim() == PROC_TYPE_ENCRYPTED)
}

/// The `DEK-Info: <cipher>,<hex iv>` header of an encrypted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DekInfo {
    cipher: PemCipher,
    iv: Vec<u8>,
}

impl DekInfo {
    pub fn new(cipher: PemCipher, iv: Vec<u8>) -> Result<Self> {
        if iv.len() != cipher.block_len() {
            bail!(KeyError::MalformedHeader(format!(
                "{cipher} needs a {}-byte IV, got {}",
                cipher.block_len(),
                iv.len()
            )));
        }
        Ok(Self { cipher, iv })
    }

    pub fn cipher(&self) -> PemCipher {
        self.cipher
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Key derivation salt: the leading bytes of the IV.
    pub fn salt(&self) -> &[u8] {
        &self.iv[..SALT_LEN]
    }

    pub fn to_header_value(&self) -> String {
        format!("{},{}", self.cipher.name(), hex::encode(&self.iv))
    }

    pub fn parse(value: &str) -> Result<Self> {
        let Some((name, iv_hex)) = value.trim().split_once(',') else {
            bail!(KeyError::MalformedHeader(format!(
                "{DEK_INFO} '{value}' has no IV"
            )));
        };

        let cipher = name.trim().parse::<PemCipher>()?;
        let iv = hex::decode(iv_hex.trim()).map_err(|e| {
            KeyError::MalformedHeader(format!("{DEK_INFO} IV is not valid hex: {e}"))
        })?;
        Self::new(cipher, iv)
    }

    pub fn from_pem(block: &Pem) -> Result<Self> {
        match block.headers().get(DEK_INFO) {
            Some(value) => Self::parse(value),
            None => bail!(KeyError::MalformedHeader(format!(
                "{} block has no {DEK_INFO} header",
                block.tag()
            ))),
        }
    }

    /// Adds `Proc-Type` and then `DEK-Info` to the block headers.
    pub fn write_headers(&self, block: &mut Pem) -> Result<()> {
        let headers = block.headers_mut();
        headers.add(PROC_TYPE, PROC_TYPE_ENCRYPTED)?;
        headers.add(DEK_INFO, &self.to_header_value())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_value_roundtrip() {
        let dek = DekInfo::new(PemCipher::TripleDes, vec![0xab; 8]).unwrap();
        assert_eq!(dek.to_header_value(), "DES-EDE3-CBC,abababababababab");

        let parsed = DekInfo::parse(&dek.to_header_value()).unwrap();
        assert_eq!(parsed, dek);
        assert_eq!(parsed.salt(), &[0xab; 8]);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let parsed = DekInfo::parse("AES-128-CBC,00112233445566778899AABBCCDDEEFF").unwrap();
        assert_eq!(parsed.cipher(), PemCipher::Aes128);
        assert_eq!(parsed.iv()[15], 0xff);
        assert_eq!(parsed.salt().len(), SALT_LEN);
    }

    #[test]
    fn missing_iv_fails() {
        assert!(DekInfo::parse("DES-EDE3-CBC").is_err());
    }

    #[test]
    fn wrong_iv_length_fails() {
        assert!(DekInfo::parse("AES-256-CBC,0011223344556677").is_err());
    }

    #[test]
    fn invalid_hex_fails() {
        assert!(DekInfo::parse("DES-EDE3-CBC,zzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn unknown_cipher_fails() {
        let err = DekInfo::parse("RC2-40-CBC,0011223344556677").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeyError>(),
            Some(KeyError::UnknownCipher(_))
        ));
    }

    #[test]
    fn headers_are_written_in_order() {
        let dek = DekInfo::new(PemCipher::TripleDes, vec![1u8; 8]).unwrap();
        let mut block = Pem::new("PRIVATE KEY", vec![0u8; 8]);
        dek.write_headers(&mut block).unwrap();

        assert!(is_encrypted(&block));
        let names: Vec<_> = block.headers().iter().map(|(k, _)| k).collect();
        assert_eq!(names, [PROC_TYPE, DEK_INFO]);
        assert_eq!(DekInfo::from_pem(&block).unwrap(), dek);
    }

    #[test]
    fn plain_block_is_not_encrypted() {
        let block = Pem::new("PRIVATE KEY", vec![0u8; 8]);
        assert!(!is_encrypted(&block));
        assert!(DekInfo::from_pem(&block).is_err());
    }
}
