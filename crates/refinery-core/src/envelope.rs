//! Encryption Envelope — armored passphrase protection for byte artifacts
//!
//! A sealed artifact is a self-describing text container: a header line, a
//! `Version` field, a blank line, the base64 body wrapped at 64 columns, and
//! a footer line. The body is a fresh random 24-byte XChaCha20-Poly1305
//! nonce followed by the ciphertext.
//!
//! The key is derived with PBKDF2-HMAC-SHA256 over the passphrase using the
//! fixed salt [`KDF_SALT`] and [`KDF_ITERATIONS`] iterations. Salt and
//! iteration count are deliberately constant and documented so that an
//! external decryptor that knows only the passphrase derives the same key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, Key, XChaCha20Poly1305, XNonce};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{RefineryError, Result};

pub const ENVELOPE_HEADER: &str = "-----BEGIN REFINERY ENCRYPTED ARTIFACT-----";
pub const ENVELOPE_FOOTER: &str = "-----END REFINERY ENCRYPTED ARTIFACT-----";
pub const ENVELOPE_VERSION: u32 = 1;

/// Fixed key-derivation salt, versioned with the envelope format
pub const KDF_SALT: &[u8] = b"refinery.envelope.v1";
/// PBKDF2-HMAC-SHA256 iteration count
pub const KDF_ITERATIONS: u32 = 100_000;

const NONCE_LEN: usize = 24;
const ARMOR_WIDTH: usize = 64;

/// Seal a byte payload under a passphrase, producing the armored envelope
pub fn seal(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&derive_key(passphrase)));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| RefineryError::Encryption("AEAD encryption failed".to_string()))?;

    let mut body = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);
    let encoded = BASE64.encode(&body);

    let mut armored = String::with_capacity(encoded.len() + 128);
    armored.push_str(ENVELOPE_HEADER);
    armored.push('\n');
    armored.push_str(&format!("Version: {}\n\n", ENVELOPE_VERSION));
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(ARMOR_WIDTH));
        armored.push_str(line);
        armored.push('\n');
        rest = tail;
    }
    armored.push_str(ENVELOPE_FOOTER);
    armored.push('\n');
    Ok(armored.into_bytes())
}

/// Open an armored envelope with a passphrase.
///
/// Any malformed, truncated or wrong-passphrase input fails with
/// [`RefineryError::Decryption`]; no other error kind escapes this function.
pub fn open(passphrase: &str, envelope: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(envelope)
        .map_err(|_| decryption("envelope is not valid armor text"))?;
    let mut lines = text.lines();

    let header = lines.next().ok_or_else(|| decryption("empty envelope"))?;
    if header.trim() != ENVELOPE_HEADER {
        return Err(decryption("missing armor header"));
    }

    let mut version: Option<u32> = None;
    let mut body = String::new();
    let mut in_body = false;
    let mut saw_footer = false;
    for line in lines {
        let line = line.trim();
        if line == ENVELOPE_FOOTER {
            saw_footer = true;
            break;
        }
        if !in_body {
            if line.is_empty() {
                in_body = true;
            } else if let Some(value) = line.strip_prefix("Version:") {
                version = value.trim().parse().ok();
            }
            continue;
        }
        body.push_str(line);
    }
    if !saw_footer {
        return Err(decryption("missing armor footer"));
    }
    match version {
        Some(ENVELOPE_VERSION) => {}
        Some(other) => return Err(decryption(&format!("unsupported envelope version {}", other))),
        None => return Err(decryption("missing envelope version")),
    }

    let raw = BASE64
        .decode(body.as_bytes())
        .map_err(|_| decryption("invalid base64 body"))?;
    if raw.len() < NONCE_LEN {
        return Err(decryption("truncated envelope body"));
    }
    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&derive_key(passphrase)));
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| decryption("authentication failed (wrong passphrase or corrupted data)"))
}

/// Seal a file on disk; returns the sealed artifact path.
///
/// Defaults to `<input>.enc` when no output path is given. A partially
/// written output is removed on failure.
pub fn seal_file(passphrase: &str, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| {
        let mut name = input.as_os_str().to_owned();
        name.push(".enc");
        PathBuf::from(name)
    });

    let plaintext = std::fs::read(input)
        .map_err(|e| RefineryError::Encryption(format!("cannot read '{}': {}", input.display(), e)))?;
    let sealed = seal(passphrase, &plaintext)?;
    if let Err(e) = std::fs::write(&output, &sealed) {
        let _ = std::fs::remove_file(&output);
        return Err(RefineryError::Encryption(format!(
            "cannot write '{}': {}",
            output.display(),
            e
        )));
    }
    info!(artifact = %output.display(), "sealed artifact");
    Ok(output)
}

/// Open a sealed file on disk; returns the decrypted artifact path.
///
/// Defaults to the input path without its `.enc` suffix, or `<input>.dec`
/// when the suffix is absent. A partially written output is removed on
/// failure, and every failure is a [`RefineryError::Decryption`].
pub fn open_file(passphrase: &str, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| {
        match input.to_str().and_then(|s| s.strip_suffix(".enc")) {
            Some(stripped) => PathBuf::from(stripped),
            None => {
                let mut name = input.as_os_str().to_owned();
                name.push(".dec");
                PathBuf::from(name)
            }
        }
    });

    let result = std::fs::read(input)
        .map_err(|e| decryption(&format!("cannot read '{}': {}", input.display(), e)))
        .and_then(|envelope| open(passphrase, &envelope))
        .and_then(|plaintext| {
            std::fs::write(&output, plaintext)
                .map_err(|e| decryption(&format!("cannot write '{}': {}", output.display(), e)))
        });
    if let Err(e) = result {
        let _ = std::fs::remove_file(&output);
        return Err(e);
    }
    info!(artifact = %output.display(), "decrypted artifact");
    Ok(output)
}

fn derive_key(passphrase: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
    key
}

fn decryption(message: &str) -> RefineryError {
    RefineryError::Decryption(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_seal_open_round_trip() {
        let payload = b"the refined artifact bytes";
        let sealed = seal("passphrase", payload).expect("seal should succeed");
        let opened = open("passphrase", &sealed).expect("open should succeed");
        assert_eq!(opened, payload);
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let sealed = seal("passphrase", b"").unwrap();
        assert_eq!(open("passphrase", &sealed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_envelope_is_armored_text() {
        let sealed = seal("k", b"payload").unwrap();
        let text = String::from_utf8(sealed).expect("armor should be UTF-8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(ENVELOPE_HEADER));
        assert_eq!(lines.next(), Some("Version: 1"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(text.lines().last(), Some(ENVELOPE_FOOTER));
        for line in text.lines() {
            assert!(line.len() <= ENVELOPE_HEADER.len().max(ARMOR_WIDTH));
        }
    }

    #[test]
    fn test_wrong_passphrase_is_a_decryption_error() {
        let sealed = seal("right", b"secret").unwrap();
        let err = open("wrong", &sealed).expect_err("wrong passphrase must fail");
        assert!(matches!(err, RefineryError::Decryption(_)));
    }

    #[test]
    fn test_malformed_and_truncated_envelopes() {
        for bad in [
            &b""[..],
            &b"not an envelope at all"[..],
            &b"-----BEGIN REFINERY ENCRYPTED ARTIFACT-----\nVersion: 1\n\nAAAA\n"[..],
            &[0xff, 0xfe, 0x00][..],
        ] {
            let err = open("k", bad).expect_err("malformed envelope must fail");
            assert!(matches!(err, RefineryError::Decryption(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let sealed = String::from_utf8(seal("k", b"payload").unwrap()).unwrap();
        let bumped = sealed.replace("Version: 1", "Version: 9");
        let err = open("k", bumped.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_open_file_failure_leaves_no_output_behind() {
        let dir = tempfile::tempdir().unwrap();
        let sealed_path = dir.path().join("db.libsql.enc");
        let payload = b"relational store bytes";
        let sealed = seal("right", payload).unwrap();
        std::fs::write(&sealed_path, sealed).unwrap();

        let err = open_file("wrong", &sealed_path, None).unwrap_err();
        assert!(matches!(err, RefineryError::Decryption(_)));
        assert!(!dir.path().join("db.libsql").exists());

        let opened = open_file("right", &sealed_path, None).unwrap();
        assert_eq!(opened, dir.path().join("db.libsql"));
        assert_eq!(std::fs::read(opened).unwrap(), payload);
    }

    #[test]
    fn test_seal_file_defaults_to_enc_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("db.libsql");
        std::fs::write(&input, b"store").unwrap();

        let sealed = seal_file("k", &input, None).unwrap();
        assert_eq!(sealed, dir.path().join("db.libsql.enc"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_round_trip_arbitrary_payloads(
            passphrase in ".*",
            payload in proptest::collection::vec(any::<u8>(), 0..1024),
        ) {
            let sealed = seal(&passphrase, &payload).unwrap();
            let opened = open(&passphrase, &sealed).unwrap();
            prop_assert_eq!(opened, payload);
        }
    }
}
