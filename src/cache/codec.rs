//! Reversible transforms applied to serialized entries on string media.
//!
//! Encoding is compress-then-encrypt; decoding runs the reverse. Each step is best effort: a
//! failing step is logged and its input passed through unchanged.

use std::io::{Cursor, Read as _, Write as _};

use anyhow::Context as _;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore as _;
use sha2::Digest as _;

const ENCRYPTION_MAGIC: &[u8] = b"BFENC1";
const NONCE_LEN: usize = 24;
const ZIP_ENTRY_NAME: &str = "entry.json";

#[derive(Clone)]
pub struct EntryCodec {
    compression: bool,
    key: Option<[u8; 32]>,
}

impl std::fmt::Debug for EntryCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryCodec")
            .field("compression", &self.compression)
            .field("encryption", &self.key.is_some())
            .finish()
    }
}

impl EntryCodec {
    pub fn new(compression: bool, encryption_key: Option<&str>) -> Self {
        let key = encryption_key.filter(|k| !k.is_empty()).map(|k| {
            let digest = sha2::Sha256::digest(k.as_bytes());
            let mut key = [0_u8; 32];
            key.copy_from_slice(&digest);
            key
        });
        Self { compression, key }
    }

    pub fn encode(&self, plain: &str) -> String {
        let mut out = plain.to_owned();
        if self.compression {
            out = match compress(&out) {
                Ok(compressed) => compressed,
                Err(err) => {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "cache entry compression failed; storing uncompressed"
                    );
                    out
                }
            };
        }
        if let Some(key) = &self.key {
            out = match encrypt(key, &out) {
                Ok(encrypted) => encrypted,
                Err(err) => {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "cache entry encryption failed; storing unencrypted"
                    );
                    out
                }
            };
        }
        out
    }

    pub fn decode(&self, stored: &str) -> String {
        let mut out = stored.to_owned();
        if let Some(key) = &self.key {
            out = match decrypt(key, &out) {
                Ok(decrypted) => decrypted,
                Err(err) => {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "cache entry decryption failed; reading as stored"
                    );
                    out
                }
            };
        }
        if self.compression {
            out = match decompress(&out) {
                Ok(decompressed) => decompressed,
                Err(err) => {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "cache entry decompression failed; reading as stored"
                    );
                    out
                }
            };
        }
        out
    }
}

fn compress(plain: &str) -> anyhow::Result<String> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    zip.start_file(ZIP_ENTRY_NAME, options)
        .context("zip start_file")?;
    zip.write_all(plain.as_bytes()).context("zip write")?;
    let bytes = zip.finish().context("zip finish")?.into_inner();
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn decompress(stored: &str) -> anyhow::Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(stored)
        .context("decode base64")?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("open zip")?;
    let mut file = archive.by_name(ZIP_ENTRY_NAME).context("find zip entry")?;
    let mut out = String::new();
    file.read_to_string(&mut out).context("read zip entry")?;
    Ok(out)
}

fn encrypt(key: &[u8; 32], plain: &str) -> anyhow::Result<String> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce_bytes = [0_u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), plain.as_bytes())
        .map_err(|err| anyhow::anyhow!("encrypt: {err}"))?;

    let mut out = Vec::with_capacity(ENCRYPTION_MAGIC.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ENCRYPTION_MAGIC);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(out))
}

fn decrypt(key: &[u8; 32], stored: &str) -> anyhow::Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(stored)
        .context("decode base64")?;
    if bytes.len() <= ENCRYPTION_MAGIC.len() + NONCE_LEN {
        anyhow::bail!("encrypted payload is too short");
    }
    if !bytes.starts_with(ENCRYPTION_MAGIC) {
        anyhow::bail!("encrypted payload is missing expected header");
    }

    let nonce_start = ENCRYPTION_MAGIC.len();
    let nonce_end = nonce_start + NONCE_LEN;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let plain = cipher
        .decrypt(XNonce::from_slice(&bytes[nonce_start..nonce_end]), &bytes[nonce_end..])
        .map_err(|err| anyhow::anyhow!("decrypt: {err}"))?;
    String::from_utf8(plain).context("decrypted payload is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{"query":"golang tutorials","timestamp":1,"data":{"n":"ünïcode"}}"#;

    #[test]
    fn identity_codec_passes_text_through() {
        let codec = EntryCodec::new(false, None);
        assert_eq!(codec.encode(ENTRY), ENTRY);
        assert_eq!(codec.decode(ENTRY), ENTRY);
    }

    #[test]
    fn full_codec_hides_plaintext_and_reverses() {
        let codec = EntryCodec::new(true, Some("s3cret"));
        let stored = codec.encode(ENTRY);
        assert!(!stored.contains("golang"));
        assert_eq!(codec.decode(&stored), ENTRY);
    }

    #[test]
    fn encryption_uses_fresh_nonces() {
        let codec = EntryCodec::new(false, Some("s3cret"));
        assert_ne!(codec.encode(ENTRY), codec.encode(ENTRY));
    }

    #[test]
    fn wrong_key_falls_back_to_stored_text() {
        let writer = EntryCodec::new(false, Some("right"));
        let reader = EntryCodec::new(false, Some("wrong"));
        let stored = writer.encode(ENTRY);
        assert_eq!(reader.decode(&stored), stored);
    }

    #[test]
    fn raw_entries_survive_a_codec_that_expects_transforms() {
        let codec = EntryCodec::new(true, Some("key"));
        assert_eq!(codec.decode(ENTRY), ENTRY);
    }
}
