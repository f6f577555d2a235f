//! The Leakage Resilient Primitive (NXP AN12304): key-dependent plaintext and
//! updated-key tables, LRP evaluation, LRICB block en-/decryption and
//! LRP-CMAC.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use super::cmac::cmac_blocks;
use super::crypto::{decrypt_aes_ecb, encrypt_aes_ecb, gf_double, increment_be_slice, BLOCK_SIZE};
use super::{CryptoError, CryptoResult};

const CHAINING_SEED: [u8; BLOCK_SIZE] = [0x55; BLOCK_SIZE];
const EXTRACTION_SEED: [u8; BLOCK_SIZE] = [0xaa; BLOCK_SIZE];
const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

pub const PLAINTEXTS_COUNT: usize = 16;
pub const UPDATED_KEYS_COUNT: usize = 4;

/// Derives the 16-entry plaintexts table from a key (AN12304, algorithm 1).
pub fn generate_plaintexts(key: &[u8]) -> CryptoResult<Vec<Vec<u8>>> {
    let mut h = encrypt_aes_ecb(&CHAINING_SEED, key)?;
    let mut plaintexts = Vec::with_capacity(PLAINTEXTS_COUNT);
    for _ in 0..PLAINTEXTS_COUNT {
        plaintexts.push(encrypt_aes_ecb(&EXTRACTION_SEED, &h)?);
        h = encrypt_aes_ecb(&CHAINING_SEED, &h)?;
    }

    Ok(plaintexts)
}

/// Derives the 4-entry updated-keys table from a key (AN12304, algorithm 2).
pub fn generate_updated_keys(key: &[u8]) -> CryptoResult<Vec<Vec<u8>>> {
    let mut h = encrypt_aes_ecb(&EXTRACTION_SEED, key)?;
    let mut updated_keys = Vec::with_capacity(UPDATED_KEYS_COUNT);
    for _ in 0..UPDATED_KEYS_COUNT {
        updated_keys.push(encrypt_aes_ecb(&EXTRACTION_SEED, &h)?);
        h = encrypt_aes_ecb(&CHAINING_SEED, &h)?;
    }

    Ok(updated_keys)
}

/// Evaluates the LRP over an input (AN12304, algorithm 3).
///
/// The input is consumed as 4-bit nibbles, high nibble of each byte first.
/// With `finalize` the result is whitened by one encryption of the zero
/// block.
pub fn eval_lrp(
    plaintexts: &[Vec<u8>],
    updated_key: &[u8],
    input: &[u8],
    finalize: bool,
) -> CryptoResult<Vec<u8>> {
    if plaintexts.len() != PLAINTEXTS_COUNT {
        return Err(CryptoError::InvalidInput);
    }

    let mut y = updated_key.to_vec();
    for &byte in input {
        for nibble in [byte >> 4, byte & 0x0f] {
            y = encrypt_aes_ecb(&plaintexts[nibble as usize], &y)?;
        }
    }
    if finalize {
        y = encrypt_aes_ecb(&ZERO_BLOCK, &y)?;
    }

    Ok(y)
}

/// An LRICB cipher instance.
///
/// Owns the key-derived tables, the selected updated key and the
/// variable-width block counter. Instances are not safe to share across
/// threads; confine each one to a single thread.
pub struct LrpCipher {
    plaintexts: Vec<Vec<u8>>,
    key: Vec<u8>,
    counter: Vec<u8>,
    pad_counter: bool,
}

impl LrpCipher {
    /// Creates a cipher over `key`, selecting updated key `update_mode`
    /// (0..=3).
    ///
    /// An empty `counter` starts at one zero-filled block; a shorter counter
    /// keeps its width and wraps within it. `pad_counter` enables ISO/IEC
    /// 9797-1 method 2 padding on encryption and its removal on decryption.
    pub fn new(
        key: &[u8],
        update_mode: usize,
        counter: &[u8],
        pad_counter: bool,
    ) -> CryptoResult<Self> {
        if counter.len() > BLOCK_SIZE {
            return Err(CryptoError::InvalidInput);
        }

        let plaintexts = generate_plaintexts(key)?;
        let mut updated_keys = generate_updated_keys(key)?;
        if update_mode >= updated_keys.len() {
            return Err(CryptoError::InvalidInput);
        }
        let key = updated_keys.swap_remove(update_mode);

        let counter = if counter.is_empty() {
            ZERO_BLOCK.to_vec()
        } else {
            counter.to_vec()
        };

        Ok(Self {
            plaintexts,
            key,
            counter,
            pad_counter,
        })
    }

    pub fn counter(&self) -> &[u8] {
        &self.counter
    }

    /// Encrypts with LRICB, advancing the counter one step per block.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        if plaintext.is_empty() {
            return Err(CryptoError::InvalidInput);
        }

        let mut buffer = plaintext.to_vec();
        if self.pad_counter {
            buffer.push(0x80);
            buffer.resize(buffer.len().next_multiple_of(BLOCK_SIZE), 0);
        } else if plaintext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidInput);
        }

        let mut output = Vec::with_capacity(buffer.len());
        for block in buffer.chunks(BLOCK_SIZE) {
            let block_key = self.next_block_key()?;
            output.extend_from_slice(&encrypt_aes_ecb(block, &block_key)?);
        }

        Ok(output)
    }

    /// Decrypts with LRICB, advancing the counter one step per block.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidInput);
        }

        let mut output = Vec::with_capacity(ciphertext.len());
        for block in ciphertext.chunks(BLOCK_SIZE) {
            let block_key = self.next_block_key()?;
            output.extend_from_slice(&decrypt_aes_ecb(block, &block_key)?);
        }

        if self.pad_counter {
            output = strip_padding(output)?;
        }

        Ok(output)
    }

    /// Computes the LRP-CMAC of a message. Leaves the counter untouched.
    pub fn cmac(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        let k0 = eval_lrp(&self.plaintexts, &self.key, &ZERO_BLOCK, true)?;
        let k1 = gf_double(&k0);
        let k2 = gf_double(&k1);

        cmac_blocks(message, &k1, &k2, |state| {
            eval_lrp(&self.plaintexts, &self.key, state, true)
        })
    }

    fn next_block_key(&mut self) -> CryptoResult<Vec<u8>> {
        let block_key = eval_lrp(&self.plaintexts, &self.key, &self.counter, true)?;
        increment_be_slice(&mut self.counter);
        Ok(block_key)
    }
}

/// Removes ISO/IEC 9797-1 method 2 padding from the final block.
///
/// The scan always touches all 16 trailing bytes; the marker position is
/// tracked with constant-time selects.
fn strip_padding(mut plaintext: Vec<u8>) -> CryptoResult<Vec<u8>> {
    let tail_start = plaintext.len() - BLOCK_SIZE;

    let mut in_padding = Choice::from(1);
    let mut marker_found = Choice::from(0);
    let mut pad_len = 0u8;
    for &byte in plaintext[tail_start..].iter().rev() {
        let is_zero = byte.ct_eq(&0x00);
        let is_marker = byte.ct_eq(&0x80);
        let strip = in_padding & (is_zero | is_marker);
        pad_len = u8::conditional_select(&pad_len, &(pad_len + 1), strip);
        marker_found |= in_padding & is_marker;
        in_padding &= is_zero;
    }

    if !bool::from(marker_found) {
        return Err(CryptoError::InvalidPadding);
    }
    plaintext.truncate(plaintext.len() - pad_len as usize);

    Ok(plaintext)
}
