use super::crypto::{encrypt_aes_ecb, gf_double, xor_slice_mut, BLOCK_SIZE};
use super::CryptoResult;

const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// Generates the CMAC subkeys K1 and K2 (NIST SP 800-38B, chapter 6.1).
pub fn generate_subkeys(key: &[u8]) -> CryptoResult<(Vec<u8>, Vec<u8>)> {
    let l = encrypt_aes_ecb(&ZERO_BLOCK, key)?;
    let k1 = gf_double(&l);
    let k2 = gf_double(&k1);

    Ok((k1, k2))
}

/// Computes the AES-CMAC of a message (NIST SP 800-38B).
pub fn compute_cmac(message: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
    let (k1, k2) = generate_subkeys(key)?;
    cmac_blocks(message, &k1, &k2, |state| encrypt_aes_ecb(state, key))
}

/// The block iteration shared by AES-CMAC and LRP-CMAC.
///
/// `prf` encrypts one running-state block; the caller chooses AES-ECB or an
/// LRP evaluation. The final block is XORed with `k1` when it is complete,
/// with `k2` after 0x80-padding otherwise (including the empty message).
pub(crate) fn cmac_blocks(
    message: &[u8],
    k1: &[u8],
    k2: &[u8],
    mut prf: impl FnMut(&[u8]) -> CryptoResult<Vec<u8>>,
) -> CryptoResult<Vec<u8>> {
    let remainder = message.len() % BLOCK_SIZE;
    let num_blocks = message.len().div_ceil(BLOCK_SIZE).max(1);
    let last_block_is_complete = !message.is_empty() && remainder == 0;

    let mut last_block = message[(num_blocks - 1) * BLOCK_SIZE..].to_vec();
    if !last_block_is_complete {
        last_block.push(0x80);
        last_block.resize(BLOCK_SIZE, 0);
    }
    xor_slice_mut(&mut last_block, if last_block_is_complete { k1 } else { k2 });

    let mut state = ZERO_BLOCK.to_vec();
    for block in message.chunks(BLOCK_SIZE).take(num_blocks - 1) {
        xor_slice_mut(&mut state, block);
        state = prf(&state)?;
    }
    xor_slice_mut(&mut state, &last_block);
    prf(&state)
}
