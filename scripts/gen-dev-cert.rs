//! Dev certificate generator. From the repository root:
//! `cargo run --manifest-path scripts/Cargo.toml`
//!
//! Writes a self-signed localhost certificate to certs/, where the server
//! looks when TLS_CERT_PATH/TLS_KEY_PATH are unset.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use ring::digest::{digest, SHA256};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const CERT_DIR: &str = "certs";
const CERT_FILE: &str = "certs/cert.pem";
const KEY_FILE: &str = "certs/key.pem";

// Browsers refuse serverCertificateHashes for certs valid longer than 14 days
const VALIDITY: Duration = Duration::from_secs(14 * 24 * 60 * 60);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if Path::new(CERT_FILE).exists() && Path::new(KEY_FILE).exists() {
        println!("Certificates already exist in {}/ (delete them to regenerate)\n", CERT_DIR);
        return print_hashes();
    }

    println!("Generating development certificate for localhost...\n");
    fs::create_dir_all(CERT_DIR)?;

    let mut params = CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])?;
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "Sea Turtle Dev");

    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after = (now + VALIDITY).into();

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    fs::write(CERT_FILE, cert.pem())?;
    fs::write(KEY_FILE, key_pair.serialize_pem())?;
    println!("Certificate: {}", CERT_FILE);
    println!("Private key: {}\n", KEY_FILE);

    print_hashes()
}

fn print_hashes() -> Result<(), Box<dyn std::error::Error>> {
    let cert = pem::parse(fs::read_to_string(CERT_FILE)?)?;
    let key_pair = KeyPair::from_pem(&fs::read_to_string(KEY_FILE)?)?;

    let cert_hash = STANDARD.encode(digest(&SHA256, cert.contents()).as_ref());
    let spki_hash = STANDARD.encode(digest(&SHA256, &key_pair.public_key_der()).as_ref());

    println!("WebTransport serverCertificateHashes value:");
    println!("  {}\n", cert_hash);
    println!("Chrome flag:");
    println!("  --ignore-certificate-errors-spki-list={}", spki_hash);
    Ok(())
}
