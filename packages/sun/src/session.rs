//! Session vectors and session-key derivation.
//!
//! Every SUN message is protected by short-lived session keys derived from
//! the file read key and the PICC data payload (`UID || read counter`). Two
//! fixed 6-byte prefixes distinguish the encryption key (SV1) from the MAC
//! key (SV2).

use sdm_core::security::{compute_cmac, CryptoResult, LrpCipher, BLOCK_SIZE};

/// Prefix of the file-data encryption session stream.
pub const SV1_PREFIX: [u8; 6] = [0xc3, 0x3c, 0x00, 0x01, 0x00, 0x80];
/// Prefix of the SDMMAC session stream.
pub const SV2_PREFIX: [u8; 6] = [0x3c, 0xc3, 0x00, 0x01, 0x00, 0x80];

const LRP_PREFIX: [u8; 4] = [0x00, 0x01, 0x00, 0x80];
const LRP_TRAILER: [u8; 2] = [0x1e, 0xe1];

/// Selects which session key a derivation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionVector {
    /// SV1, keying the file-data decryption.
    Encryption,
    /// SV2, keying the SDMMAC.
    Mac,
}

impl SessionVector {
    fn prefix(self) -> &'static [u8] {
        match self {
            SessionVector::Encryption => &SV1_PREFIX,
            SessionVector::Mac => &SV2_PREFIX,
        }
    }
}

/// Builds the AES-mode derivation stream: `SVx || PICC data`, zero-padded to a
/// block boundary.
pub fn aes_session_stream(sv: SessionVector, picc_data: &[u8]) -> Vec<u8> {
    let mut stream = sv.prefix().to_vec();
    stream.extend_from_slice(picc_data);
    stream.resize(stream.len().next_multiple_of(BLOCK_SIZE), 0);
    stream
}

/// Builds the LRP-mode derivation stream: `00 01 00 80 || PICC data`,
/// zero-padded so that the `1E E1` trailer completes a block.
///
/// In LRP mode the MAC and encryption keys share this stream; they diverge
/// through the update mode of the cipher instance consuming the derived key.
pub fn lrp_session_stream(picc_data: &[u8]) -> Vec<u8> {
    let mut stream = LRP_PREFIX.to_vec();
    stream.extend_from_slice(picc_data);
    while (stream.len() + LRP_TRAILER.len()) % BLOCK_SIZE != 0 {
        stream.push(0);
    }
    stream.extend_from_slice(&LRP_TRAILER);
    stream
}

/// Derives an AES session key for the given session vector.
pub fn derive_aes_session_key(
    file_key: &[u8],
    sv: SessionVector,
    picc_data: &[u8],
) -> CryptoResult<Vec<u8>> {
    compute_cmac(&aes_session_stream(sv, picc_data), file_key)
}

/// Derives the LRP session key.
pub fn derive_lrp_session_key(file_key: &[u8], picc_data: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = LrpCipher::new(file_key, 0, &[], false)?;
    cipher.cmac(&lrp_session_stream(picc_data))
}

#[cfg(test)]
mod test {
    use super::*;

    const PICC_DATA: [u8; 10] = [
        0x04, 0xde, 0x5f, 0x1e, 0xac, 0xc0, 0x40, 0x3d, 0x00, 0x00,
    ];

    #[test]
    fn test_aes_session_stream_layout() {
        let stream = aes_session_stream(SessionVector::Mac, &PICC_DATA);
        assert_eq!(stream.len(), 16);
        assert_eq!(&stream[..6], &SV2_PREFIX);
        assert_eq!(&stream[6..], &PICC_DATA);

        // A shorter payload is zero-padded to the block boundary
        let stream = aes_session_stream(SessionVector::Encryption, &PICC_DATA[..7]);
        assert_eq!(stream.len(), 16);
        assert_eq!(&stream[..6], &SV1_PREFIX);
        assert_eq!(&stream[13..], &[0, 0, 0]);
    }

    #[test]
    fn test_lrp_session_stream_layout() {
        let stream = lrp_session_stream(&PICC_DATA);
        assert_eq!(stream.len(), 16);
        assert_eq!(&stream[..4], &LRP_PREFIX);
        assert_eq!(&stream[4..14], &PICC_DATA);
        assert_eq!(&stream[14..], &LRP_TRAILER);

        // The trailer always completes a block
        let stream = lrp_session_stream(&PICC_DATA[..7]);
        assert_eq!(stream.len(), 16);
        assert_eq!(&stream[11..14], &[0, 0, 0]);
        assert_eq!(&stream[14..], &LRP_TRAILER);
    }

    #[test]
    fn test_session_keys_diverge_by_vector() {
        let key = [0x42; 16];
        let enc = derive_aes_session_key(&key, SessionVector::Encryption, &PICC_DATA).unwrap();
        let mac = derive_aes_session_key(&key, SessionVector::Mac, &PICC_DATA).unwrap();
        assert_eq!(enc.len(), 16);
        assert_eq!(mac.len(), 16);
        assert_ne!(enc, mac);
    }

    #[test]
    fn test_lrp_session_key_is_deterministic() {
        let key = [0x42; 16];
        let derived = derive_lrp_session_key(&key, &PICC_DATA).unwrap();
        assert_eq!(derived.len(), 16);
        assert_eq!(derived, derive_lrp_session_key(&key, &PICC_DATA).unwrap());
        assert_ne!(derived, derive_lrp_session_key(&key, &PICC_DATA[..7]).unwrap());
    }
}
