//! AES-256-CBC with PKCS#7-style padding.
//!
//! Encoded blob layout: `IV (16 bytes) || ciphertext`, where the ciphertext
//! length is a non-zero multiple of the block size. There is no
//! authentication tag; the padding check on decryption is the only
//! integrity signal, so a wrong key is detected with high probability but
//! not with certainty.

use crate::config::BLOCK_SIZE;
use crate::crypto::kdf::DerivedKey;
use crate::error::{Error, Result};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256Dec, Aes256Enc, Block};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// AES-256-CBC cipher bound to one key.
pub struct Cipher {
    encryptor: Aes256Enc,
    decryptor: Aes256Dec,
}

impl Cipher {
    /// Create a new cipher from a derived key.
    pub fn new(key: &DerivedKey) -> Self {
        Self {
            encryptor: Aes256Enc::new(key.as_bytes().into()),
            decryptor: Aes256Dec::new(key.as_bytes().into()),
        }
    }

    /// Encrypt data under a fresh random IV.
    ///
    /// Returns: IV (16 bytes) || ciphertext
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; BLOCK_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    /// Encrypt data under a caller-chosen IV.
    ///
    /// Reusing an IV with the same key leaks equality of plaintext prefixes;
    /// outside of tests use [`Cipher::encrypt`].
    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; BLOCK_SIZE]) -> Vec<u8> {
        let padded = pad(plaintext);

        let mut output = Vec::with_capacity(BLOCK_SIZE + padded.len());
        output.extend_from_slice(iv);

        let mut previous = *iv;
        for chunk in padded.chunks_exact(BLOCK_SIZE) {
            let mut block = Block::default();
            xor_blocks(chunk, &previous, &mut block);
            self.encryptor.encrypt_block(&mut block);
            previous.copy_from_slice(&block);
            output.extend_from_slice(&block);
        }

        output
    }

    /// Encrypt under a fresh random IV, returning the blob as base64 text.
    pub fn encrypt_text(&self, plaintext: &[u8]) -> String {
        STANDARD.encode(self.encrypt(plaintext))
    }

    /// Decrypt base64 text produced by [`Cipher::encrypt_text`].
    ///
    /// Text that is not valid base64 is a `MalformedBlob`.
    pub fn decrypt_text(&self, text: &[u8]) -> Result<Vec<u8>> {
        let blob = STANDARD
            .decode(text.trim_ascii_end())
            .map_err(|_| Error::MalformedBlob { length: text.len() })?;
        self.decrypt(&blob)
    }

    /// Decrypt a blob produced by [`Cipher::encrypt`].
    ///
    /// Expects: IV (16 bytes) || ciphertext
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < BLOCK_SIZE {
            return Err(Error::MalformedBlob { length: blob.len() });
        }

        let (iv, ciphertext) = blob.split_at(BLOCK_SIZE);
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::MalformedBlob { length: blob.len() });
        }

        let mut plaintext = Vec::with_capacity(ciphertext.len());
        let mut previous = iv;
        for chunk in ciphertext.chunks_exact(BLOCK_SIZE) {
            let mut block = *Block::from_slice(chunk);
            self.decryptor.decrypt_block(&mut block);
            let mut plain = [0u8; BLOCK_SIZE];
            xor_blocks(&block, previous, &mut plain);
            plaintext.extend_from_slice(&plain);
            previous = chunk;
        }

        unpad(plaintext)
    }
}

/// Encrypt `plaintext` under `key`, returning `IV || ciphertext`.
pub fn encrypt_bytes(plaintext: &[u8], key: &DerivedKey) -> Vec<u8> {
    Cipher::new(key).encrypt(plaintext)
}

/// Decrypt an `IV || ciphertext` blob under `key`.
pub fn decrypt_bytes(blob: &[u8], key: &DerivedKey) -> Result<Vec<u8>> {
    Cipher::new(key).decrypt(blob)
}

/// Encrypt `plaintext` under `key`, returning the blob as base64 text.
pub fn encrypt_text(plaintext: &[u8], key: &DerivedKey) -> String {
    Cipher::new(key).encrypt_text(plaintext)
}

/// Decrypt a base64 text blob produced by [`encrypt_text`].
pub fn decrypt_text(text: &str, key: &DerivedKey) -> Result<Vec<u8>> {
    Cipher::new(key).decrypt_text(text.as_bytes())
}

/// Pad to a multiple of the block size; always adds 1..=16 bytes of value `n`.
fn pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, padding as u8);
    padded
}

fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>> {
    let padding = match data.last() {
        Some(&last) => last as usize,
        None => return Err(Error::InvalidPadding),
    };
    if padding == 0 || padding > BLOCK_SIZE || padding > data.len() {
        return Err(Error::InvalidPadding);
    }

    let body_len = data.len() - padding;
    if data[body_len..].iter().any(|&b| b as usize != padding) {
        return Err(Error::InvalidPadding);
    }

    data.truncate(body_len);
    Ok(data)
}

fn xor_blocks(block_a: &[u8], block_b: &[u8], output: &mut [u8]) {
    for ((out, a), b) in output.iter_mut().zip(block_a).zip(block_b) {
        *out = a ^ b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::derive_key;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = derive_key("secure_password_123");
        let plaintext = b"Hello, World! This is a secret message.";

        let blob = encrypt_bytes(plaintext, &key);
        let decrypted = decrypt_bytes(&blob, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_blob_layout() {
        let key = derive_key("password");

        // 5 bytes pad to one block, 16 bytes pad to two.
        assert_eq!(encrypt_bytes(b"hello", &key).len(), BLOCK_SIZE * 2);
        assert_eq!(encrypt_bytes(&[7u8; 16], &key).len(), BLOCK_SIZE * 3);
        assert_eq!(encrypt_bytes(b"", &key).len(), BLOCK_SIZE * 2);
    }

    #[test]
    fn test_fixed_iv_is_deterministic() {
        let cipher = Cipher::new(&derive_key("password"));
        let iv = [0x24u8; BLOCK_SIZE];

        let ct1 = cipher.encrypt_with_iv(b"same message", &iv);
        let ct2 = cipher.encrypt_with_iv(b"same message", &iv);

        assert_eq!(ct1, ct2);
        assert_eq!(&ct1[..BLOCK_SIZE], &iv);
    }

    #[test]
    fn test_fips_197_block() {
        // FIPS-197 appendix C.3: AES-256 on a single block. With a zero IV
        // the first CBC block equals the raw block cipher output.
        let key_bytes: Vec<u8> = (0u8..32).collect();
        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        let cipher = Cipher::new(&DerivedKey::from_bytes(key));

        let plaintext = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let blob = cipher.encrypt_with_iv(&plaintext, &[0u8; BLOCK_SIZE]);

        assert_eq!(
            hex::encode(&blob[BLOCK_SIZE..BLOCK_SIZE * 2]),
            "8ea2b7ca516745bfeafc49904b496089"
        );
        assert_eq!(cipher.decrypt(&blob).unwrap(), plaintext);
    }

    #[test]
    fn test_different_encryptions_different_ciphertext() {
        let key = derive_key("password");

        let blob1 = encrypt_bytes(b"Same message", &key);
        let blob2 = encrypt_bytes(b"Same message", &key);

        assert_ne!(blob1, blob2);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = derive_key("password");

        let blob = encrypt_bytes(b"", &key);
        assert_eq!(decrypt_bytes(&blob, &key).unwrap(), b"");
    }

    #[test]
    fn test_large_plaintext() {
        let key = derive_key("password");
        let plaintext: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();

        let blob = encrypt_bytes(&plaintext, &key);
        assert_eq!(decrypt_bytes(&blob, &key).unwrap(), plaintext);
    }

    #[test]
    fn test_text_roundtrip() {
        let key = derive_key("password");

        let text = encrypt_text(b"hello", &key);
        assert!(text.is_ascii());
        assert_eq!(decrypt_text(&text, &key).unwrap(), b"hello");
        assert_eq!(decrypt_text(&format!("{}\n", text), &key).unwrap(), b"hello");
        assert!(matches!(
            decrypt_text("not base64!", &key),
            Err(Error::MalformedBlob { .. })
        ));
    }

    #[test]
    fn test_wrong_key_fails_padding() {
        let right = derive_key("correct_password");
        let wrong = derive_key("wrong_password");

        // A wrong key passes the padding check about once in 256 tries, so
        // require that at least one of several independent blobs is caught.
        let failures = (0..8)
            .map(|_| encrypt_bytes(b"Secret data", &right))
            .filter(|blob| matches!(decrypt_bytes(blob, &wrong), Err(Error::InvalidPadding)))
            .count();

        assert!(failures > 0);
    }

    #[test]
    fn test_short_blob_is_malformed() {
        let key = derive_key("password");

        let result = decrypt_bytes(&[1, 2, 3], &key);
        assert!(matches!(result, Err(Error::MalformedBlob { length: 3 })));
    }

    #[test]
    fn test_iv_only_blob_is_malformed() {
        let key = derive_key("password");

        let result = decrypt_bytes(&[0u8; BLOCK_SIZE], &key);
        assert!(matches!(result, Err(Error::MalformedBlob { .. })));
    }

    #[test]
    fn test_misaligned_blob_is_malformed() {
        let key = derive_key("password");
        let mut blob = encrypt_bytes(b"hello", &key);
        blob.push(0);

        assert!(matches!(
            decrypt_bytes(&blob, &key),
            Err(Error::MalformedBlob { .. })
        ));
    }

    #[test]
    fn test_pad_bounds() {
        assert_eq!(pad(b""), vec![16u8; 16]);
        assert_eq!(pad(&[0u8; 15]).last(), Some(&1u8));
        assert_eq!(pad(&[0u8; 16]).len(), 32);
    }

    #[test]
    fn test_unpad_rejects_bad_padding() {
        let mut block = vec![0u8; 16];
        assert!(matches!(unpad(block.clone()), Err(Error::InvalidPadding)));

        block[15] = 17;
        assert!(matches!(unpad(block.clone()), Err(Error::InvalidPadding)));

        block[15] = 3;
        block[14] = 3;
        block[13] = 2;
        assert!(matches!(unpad(block.clone()), Err(Error::InvalidPadding)));

        block[13] = 3;
        assert_eq!(unpad(block).unwrap().len(), 13);
    }

    #[test]
    fn test_tampered_last_block_fails() {
        let key = derive_key("password");
        let cipher = Cipher::new(&key);
        let iv = [9u8; BLOCK_SIZE];

        // Flipping the IV byte that lines up with the final padding byte of a
        // single-block message turns padding 0x0b into 0xf4, which is invalid.
        let mut blob = cipher.encrypt_with_iv(b"hello", &iv);
        blob[BLOCK_SIZE - 1] ^= 0xff;

        assert!(matches!(cipher.decrypt(&blob), Err(Error::InvalidPadding)));
    }
}
