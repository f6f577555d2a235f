use aes::cipher::{
    block_padding::NoPadding,
    generic_array::{typenum::U16, GenericArray},
    BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
};
use subtle::ConstantTimeEq;

use super::{CryptoError, CryptoResult};

pub const BLOCK_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

fn aes128(key: &[u8]) -> CryptoResult<aes::Aes128> {
    aes::Aes128::new_from_slice(key).map_err(|_| CryptoError::InvalidInput)
}

fn single_block(data: &[u8]) -> CryptoResult<GenericArray<u8, U16>> {
    if data.len() != BLOCK_SIZE {
        return Err(CryptoError::InvalidInput);
    }
    let mut block: GenericArray<u8, U16> = [0; BLOCK_SIZE].into();
    block.copy_from_slice(data);
    Ok(block)
}

pub fn encrypt_aes_ecb(plaintext: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = aes128(key)?;
    let mut block = single_block(plaintext)?;
    cipher.encrypt_block(&mut block);
    Ok(block.to_vec())
}

pub fn decrypt_aes_ecb(ciphertext: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = aes128(key)?;
    let mut block = single_block(ciphertext)?;
    cipher.decrypt_block(&mut block);
    Ok(block.to_vec())
}

pub fn encrypt_aes_cbc(plaintext: &[u8], key: &[u8], iv: &[u8]) -> CryptoResult<Vec<u8>> {
    if plaintext.is_empty() || plaintext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidInput);
    }
    let cipher =
        <Aes128CbcEnc as KeyIvInit>::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidInput)?;
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
}

pub fn decrypt_aes_cbc(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> CryptoResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidInput);
    }
    let cipher =
        <Aes128CbcDec as KeyIvInit>::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidInput)?;
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| CryptoError::InvalidInput)
}

// Computes the byte-wise XOR of two slices with the same length, mutating the first slice
pub fn xor_slice_mut(a: &mut [u8], b: &[u8]) {
    assert!(a.len() == b.len(), "Slices must have the same length");
    a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x ^= y);
}

/// Doubles a block in GF(2^128) with the 0x87 reduction polynomial.
///
/// The reduction is selected by mask so the carry bit does not steer a branch.
pub fn gf_double(input: &[u8]) -> Vec<u8> {
    assert!(!input.is_empty(), "Cannot double an empty block");

    let mut ret = vec![0; input.len()];
    for i in 0..input.len() - 1 {
        ret[i] = (input[i] << 1) | (input[i + 1] >> 7);
    }
    ret[input.len() - 1] = input[input.len() - 1] << 1;

    let reduce = (input[0] >> 7).wrapping_neg();
    ret[input.len() - 1] ^= reduce & 0x87;

    ret
}

// Increments a multi-byte unsigned integer in big-endian order by 1,
// wrapping within the slice width
pub fn increment_be_slice(buffer: &mut [u8]) {
    for i in (0..buffer.len()).rev() {
        buffer[i] = buffer[i].wrapping_add(1);
        if buffer[i] != 0x00 {
            break;
        }
    }
}

/// Compares two byte strings without revealing the position of the first
/// mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
