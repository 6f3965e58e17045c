use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use env_logger::Env;
use normalize_key::{KeyFile, KeyNormalizer, PemCipher, format};
use std::ffi::OsString;
use std::path::PathBuf;
use zeroize::Zeroizing;

#[derive(Debug, Parser)]
#[command(name = "normalize-key")]
#[command(
    version,
    about = "Re-encode an RSA private key as legacy-PEM-encrypted PKCS#8."
)]
struct Cli {
    /// Legacy PEM cipher: des-cbc, des-ede3-cbc, aes-128-cbc, aes-192-cbc or aes-256-cbc
    #[arg(
        long,
        value_name = "CIPHER",
        env = "NORMALIZE_KEY_CIPHER",
        default_value = "des-ede3-cbc"
    )]
    cipher: PemCipher,

    /// Unencrypted RSA key, PKCS#1 or PKCS#8 PEM
    input: PathBuf,

    /// Where to write the encrypted PRIVATE KEY block
    output: PathBuf,

    /// Password the output is encrypted under
    #[arg(allow_hyphen_values = true)]
    password: OsString,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let password = Zeroizing::new(args.password.into_encoded_bytes());
    let input = KeyFile::new(args.input);
    let output = KeyFile::new(args.output);

    let normalized = KeyNormalizer::new(args.cipher).normalize(&input, &output, &password)?;
    println!(
        "wrote {} ({}-bit RSA from {}, {}) to {}",
        format::PRIVATE_KEY_LABEL,
        normalized.modulus_bits(),
        normalized.encoding(),
        normalized.cipher(),
        output.path().display()
    );

    Ok(())
}
