use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum KeyError {
    ReadInput { path: PathBuf, source: io::Error },
    NoPemBlock { path: PathBuf, reason: String },
    AlreadyEncrypted { path: PathBuf },
    UnsupportedAlgorithm(String),
    UnrecognizedKey { pkcs8: String, pkcs1: String },
    MalformedHeader(String),
    UnknownCipher(String),
    Random,
    Encrypt,
    IncorrectPassword,
    WriteOutput { path: PathBuf, source: io::Error },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::ReadInput { path, .. } => write!(f, "failed to read {}", path.display()),
            KeyError::NoPemBlock { path, reason } => {
                write!(f, "no PEM block in {}: {reason}", path.display())
            }
            KeyError::AlreadyEncrypted { path } => {
                write!(f, "PEM block in {} is already encrypted", path.display())
            }
            KeyError::UnsupportedAlgorithm(oid) => {
                write!(f, "unsupported key algorithm {oid}, expected RSA")
            }
            KeyError::UnrecognizedKey { pkcs8, pkcs1 } => write!(
                f,
                "key is neither PKCS#8 nor PKCS#1 RSA (PKCS#8: {pkcs8}; PKCS#1: {pkcs1})"
            ),
            KeyError::MalformedHeader(msg) => write!(f, "malformed PEM encryption header: {msg}"),
            KeyError::UnknownCipher(name) => write!(f, "unknown PEM cipher '{name}'"),
            KeyError::Random => write!(f, "OS random generator unavailable"),
            KeyError::Encrypt => write!(f, "encryption failed"),
            KeyError::IncorrectPassword => write!(f, "incorrect password or corrupted data"),
            KeyError::WriteOutput { path, .. } => write!(f, "failed to write {}", path.display()),
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyError::ReadInput { source, .. } | KeyError::WriteOutput { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
