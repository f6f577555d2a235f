//! Decrypting and validating SUN messages.
//!
//! `decrypt_sun_message` handles the encrypted variant, where UID and read
//! counter hide inside the PICC data blob; `validate_plain_sun` handles the
//! plain variant, where both travel in the URL and only the SDMMAC is
//! cryptographic.

use bytes::{Buf, Bytes};
use typed_builder::TypedBuilder;

use sdm_core::prelude::*;
use sdm_core::security::{
    compute_cmac, constant_time_eq, decrypt_aes_cbc, encrypt_aes_ecb, LrpCipher, BLOCK_SIZE,
};

use crate::error::{Error, Result};
use crate::session::{derive_aes_session_key, derive_lrp_session_key, SessionVector};

/// Size of the truncated authentication tag.
pub const SDMMAC_LENGTH: usize = 8;

const PICC_RANDOM_LENGTH: usize = 8;
const LRP_FILE_COUNTER_LENGTH: usize = 6;
// UID plus read counter, the widest payload a MAC covers
const PICC_DATA_STREAM_LENGTH: usize = Uid::LENGTH + ReadCounter::LENGTH;

/// The primitive family protecting a SUN message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMode {
    Aes,
    Lrp,
}

/// How the SDM mirrors were laid out in the tap URL.
///
/// In separated mode each mirror lives in its own query parameter, and the
/// MAC input includes the parameter name joining the encrypted file data to
/// the SDMMAC. In bulk mode all mirrors share a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    Separated,
    Bulk,
}

/// The raw parts of an encrypted SUN message, as extracted from the tap URL
/// by the caller.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SunMessage<'a> {
    /// Encrypted PICC data; 16 bytes select AES mode, 24 bytes LRP mode.
    pub picc_enc_data: &'a [u8],
    /// The 8-byte truncated authentication tag.
    pub sdmmac: &'a [u8],
    #[builder(default = ParamMode::Separated)]
    pub param_mode: ParamMode,
    /// Encrypted file payload, if the tag mirrors one.
    #[builder(default)]
    pub enc_file_data: Option<&'a [u8]>,
    /// Name of the URL parameter carrying the SDMMAC.
    #[builder(default = Some("cmac"))]
    pub sdmmac_param: Option<&'a str>,
}

/// A successfully decrypted and authenticated SUN message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedSunMessage {
    pub picc_data_tag: PiccDataTag,
    pub uid: Uid,
    /// `None` when the tag does not mirror its read counter.
    pub read_counter: Option<ReadCounter>,
    pub file_data: Option<Vec<u8>>,
    pub encryption_mode: EncryptionMode,
}

/// A successfully authenticated plain SUN message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedSunMessage {
    pub encryption_mode: EncryptionMode,
    pub uid: Uid,
    pub read_counter: ReadCounter,
}

/// Decrypts and authenticates an encrypted SUN message.
///
/// `file_key_for` supplies the file read key once the UID is known; the file
/// key is usually UID-diversified, so the caller cannot derive it up front.
/// The callback runs exactly once, with a zero-filled UID on the sanitised
/// rejection path.
pub fn decrypt_sun_message<F>(
    message: &SunMessage<'_>,
    meta_key: &Aes128Key,
    file_key_for: F,
) -> Result<DecryptedSunMessage>
where
    F: FnOnce(&Uid) -> Aes128Key,
{
    if message.sdmmac.len() != SDMMAC_LENGTH {
        return Err(Error::MalformedInput("SDMMAC length"));
    }
    if let Some(enc_file) = message.enc_file_data {
        if enc_file.is_empty() || enc_file.len() % BLOCK_SIZE != 0 {
            return Err(Error::MalformedInput("encrypted file data length"));
        }
    }
    let mode = detect_mode(message.picc_enc_data)?;

    let plain = decrypt_picc_data(mode, meta_key, message.picc_enc_data)?;
    let parsed = parse_picc_data(&plain);

    // A structurally broken block still goes through the full MAC
    // computation over a substitute stream of the same width, so the
    // rejection is not distinguishable from a MAC mismatch by timing
    let file_key = file_key_for(&parsed.uid);
    let expected = calculate_sdmmac(
        message.param_mode,
        &file_key,
        &parsed.data_stream,
        message.enc_file_data,
        message.sdmmac_param,
        mode,
    )?;

    if let Some(reason) = parsed.structural_error {
        return Err(Error::DecryptionFailure(reason));
    }
    if !constant_time_eq(&expected, message.sdmmac) {
        return Err(Error::ValidationFailure("SDMMAC mismatch"));
    }

    let file_data = match message.enc_file_data {
        Some(enc_file) => {
            let Some(read_counter) = parsed.read_counter else {
                return Err(Error::DecryptionFailure("read counter missing"));
            };
            Some(decrypt_file_data(
                &file_key,
                &parsed.data_stream,
                read_counter,
                enc_file,
                mode,
            )?)
        }
        None => None,
    };

    Ok(DecryptedSunMessage {
        picc_data_tag: parsed.tag,
        uid: parsed.uid,
        read_counter: parsed.read_counter,
        file_data,
        encryption_mode: mode,
    })
}

/// Validates a plain SUN message whose UID and read counter travel in the
/// clear.
///
/// The read counter arrives in URL display order (big-endian) and is
/// reversed into the little-endian layout the MAC covers.
pub fn validate_plain_sun(
    uid: &[u8],
    read_counter: &[u8],
    sdmmac: &[u8],
    file_read_key: &Aes128Key,
    mode: EncryptionMode,
) -> Result<ValidatedSunMessage> {
    if uid.len() != Uid::LENGTH
        || read_counter.len() != ReadCounter::LENGTH
        || sdmmac.len() != SDMMAC_LENGTH
    {
        return Err(Error::ValidationFailure("malformed input"));
    }
    let uid = Uid::try_from(uid).map_err(|_| Error::ValidationFailure("malformed input"))?;

    let mut counter_le = [0; ReadCounter::LENGTH];
    for (target, source) in counter_le.iter_mut().zip(read_counter.iter().rev()) {
        *target = *source;
    }

    let mut data_stream = Vec::with_capacity(PICC_DATA_STREAM_LENGTH);
    data_stream.extend_from_slice(uid.as_slice());
    data_stream.extend_from_slice(&counter_le);

    let expected = calculate_sdmmac(
        ParamMode::Separated,
        file_read_key,
        &data_stream,
        None,
        None,
        mode,
    )?;
    if !constant_time_eq(&expected, sdmmac) {
        return Err(Error::ValidationFailure("SDMMAC mismatch"));
    }

    Ok(ValidatedSunMessage {
        encryption_mode: mode,
        uid,
        read_counter: ReadCounter::from_le_bytes(counter_le),
    })
}

/// Computes the 8-byte SDMMAC over a PICC data payload (`UID || read counter`)
/// and the encrypted file data.
pub fn calculate_sdmmac(
    param_mode: ParamMode,
    file_read_key: &Aes128Key,
    picc_data: &[u8],
    enc_file_data: Option<&[u8]>,
    sdmmac_param: Option<&str>,
    mode: EncryptionMode,
) -> Result<[u8; SDMMAC_LENGTH]> {
    let mut input = String::new();
    if let Some(enc_file) = enc_file_data {
        input.push_str(&hex::encode_upper(enc_file));
        if param_mode == ParamMode::Separated {
            if let Some(param) = sdmmac_param.filter(|name| !name.is_empty()) {
                input.push('&');
                input.push_str(param);
                input.push('=');
            }
        }
    }

    let full_mac = match mode {
        EncryptionMode::Aes => {
            let session_key =
                derive_aes_session_key(file_read_key.as_slice(), SessionVector::Mac, picc_data)?;
            compute_cmac(input.as_bytes(), &session_key)?
        }
        EncryptionMode::Lrp => {
            let session_key = derive_lrp_session_key(file_read_key.as_slice(), picc_data)?;
            let cipher = LrpCipher::new(&session_key, 0, &[], false)?;
            cipher.cmac(input.as_bytes())?
        }
    };

    Ok(truncate_mac(&full_mac))
}

/// Decrypts the mirrored file payload with the SV1 session key.
///
/// No padding is stripped; the plaintext keeps the ciphertext length.
pub fn decrypt_file_data(
    file_read_key: &Aes128Key,
    picc_data: &[u8],
    read_counter: ReadCounter,
    enc_file_data: &[u8],
    mode: EncryptionMode,
) -> Result<Vec<u8>> {
    match mode {
        EncryptionMode::Aes => {
            let session_key = derive_aes_session_key(
                file_read_key.as_slice(),
                SessionVector::Encryption,
                picc_data,
            )?;
            let mut iv_source = [0; BLOCK_SIZE];
            iv_source[..ReadCounter::LENGTH].copy_from_slice(&read_counter.to_le_bytes());
            let iv = encrypt_aes_ecb(&iv_source, &session_key)?;
            Ok(decrypt_aes_cbc(enc_file_data, &session_key, &iv)?)
        }
        EncryptionMode::Lrp => {
            let session_key = derive_lrp_session_key(file_read_key.as_slice(), picc_data)?;
            let mut counter = [0; LRP_FILE_COUNTER_LENGTH];
            counter[..ReadCounter::LENGTH].copy_from_slice(&read_counter.to_le_bytes());
            let mut cipher = LrpCipher::new(&session_key, 1, &counter, false)?;
            Ok(cipher.decrypt(enc_file_data)?)
        }
    }
}

fn detect_mode(picc_enc_data: &[u8]) -> Result<EncryptionMode> {
    match picc_enc_data.len() {
        BLOCK_SIZE => Ok(EncryptionMode::Aes),
        len if len == PICC_RANDOM_LENGTH + BLOCK_SIZE => Ok(EncryptionMode::Lrp),
        _ => Err(Error::MalformedInput("PICC data length")),
    }
}

fn decrypt_picc_data(
    mode: EncryptionMode,
    meta_key: &Aes128Key,
    picc_enc_data: &[u8],
) -> Result<Vec<u8>> {
    match mode {
        EncryptionMode::Aes => Ok(decrypt_aes_cbc(
            picc_enc_data,
            meta_key.as_slice(),
            &[0; BLOCK_SIZE],
        )?),
        EncryptionMode::Lrp => {
            let (picc_random, ciphertext) = picc_enc_data.split_at(PICC_RANDOM_LENGTH);
            let mut cipher = LrpCipher::new(meta_key.as_slice(), 0, picc_random, false)?;
            Ok(cipher.decrypt(ciphertext)?)
        }
    }
}

struct ParsedPiccData {
    tag: PiccDataTag,
    uid: Uid,
    read_counter: Option<ReadCounter>,
    /// `UID || read counter` as mirrored, or the zero-filled substitute.
    data_stream: Vec<u8>,
    structural_error: Option<&'static str>,
}

fn parse_picc_data(plain: &[u8]) -> ParsedPiccData {
    let mut input = Bytes::copy_from_slice(plain);
    let tag = PiccDataTag::from(input.get_u8());

    let structural_error = if !tag.has_supported_uid_length() {
        Some("unsupported UID length")
    } else if !tag.uid_mirror_enabled() {
        Some("UID mirror disabled")
    } else {
        None
    };
    if structural_error.is_some() {
        // Substitute values of the width the valid path would produce
        return ParsedPiccData {
            tag,
            uid: Uid::from([0; 7]),
            read_counter: None,
            data_stream: vec![0; PICC_DATA_STREAM_LENGTH],
            structural_error,
        };
    }

    let mut data_stream = Vec::with_capacity(PICC_DATA_STREAM_LENGTH);

    let mut uid_bytes = [0; Uid::LENGTH];
    input.copy_to_slice(&mut uid_bytes);
    let uid = Uid::from(uid_bytes);
    data_stream.extend_from_slice(uid.as_slice());

    let read_counter = if tag.read_counter_enabled() {
        let mut counter = [0; ReadCounter::LENGTH];
        input.copy_to_slice(&mut counter);
        data_stream.extend_from_slice(&counter);
        Some(ReadCounter::from_le_bytes(counter))
    } else {
        None
    };

    ParsedPiccData {
        tag,
        uid,
        read_counter,
        data_stream,
        structural_error: None,
    }
}

// The wire format carries the odd-indexed bytes of the full MAC
fn truncate_mac(full_mac: &[u8]) -> [u8; SDMMAC_LENGTH] {
    let mut sdmmac = [0; SDMMAC_LENGTH];
    for (target, source) in sdmmac.iter_mut().zip(full_mac.iter().skip(1).step_by(2)) {
        *target = *source;
    }
    sdmmac
}
