//! UID-bound key diversification.
//!
//! Per-tag keys are derived from a customer master key with nested
//! HMAC-SHA-256 steps and a final AES-CMAC, so that a key extracted from one
//! tag is useless against every other tag.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use sdm_core::prelude::*;
use sdm_core::security::compute_cmac;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const PICC_DATA_KEY_LABEL: &[u8] = b"PICCDataKey";
const SLOT_MASTER_KEY_LABEL: &[u8] = b"SlotMasterKey";
const DIV_BASE_KEY_LABEL: &[u8] = b"DivBaseKey";

const MASTER_KEY_MIN_LENGTH: usize = 16;
const MASTER_KEY_MAX_LENGTH: usize = 32;

// The all-zero factory master key passes through diversification unchanged
const FACTORY_KEY: [u8; 16] = [0; 16];

/// Derives the undiversified key slot shared by all tags of one master key.
///
/// Only key number 1 exists in this slot.
pub fn derive_undiversified_key(master_key: &[u8], key_number: u8) -> Result<Aes128Key> {
    validate_master_key(master_key)?;
    if key_number != 1 {
        return Err(Error::InvalidArgument("key number"));
    }
    if master_key == FACTORY_KEY {
        return Ok(Aes128Key::ZERO);
    }

    let digest = hmac_sha256(master_key, PICC_DATA_KEY_LABEL)?;
    Ok(truncate_key(&digest))
}

/// Derives a per-tag key, binding the master key to the tag UID.
///
/// Key numbers 1 and 2 exist in this slot.
pub fn derive_tag_key(master_key: &[u8], uid: &Uid, key_number: u8) -> Result<Aes128Key> {
    validate_master_key(master_key)?;
    if !(1..=2).contains(&key_number) {
        return Err(Error::InvalidArgument("key number"));
    }
    if master_key == FACTORY_KEY {
        return Ok(Aes128Key::ZERO);
    }

    let slot_label = [SLOT_MASTER_KEY_LABEL, &[key_number]].concat();
    let cmac_key = truncate_key(&hmac_sha256(master_key, &slot_label)?);

    let div_base = hmac_sha256(master_key, DIV_BASE_KEY_LABEL)?;
    let mid = truncate_key(&hmac_sha256(&div_base, uid.as_slice())?);

    let mut message = vec![0x01];
    message.extend_from_slice(mid.as_slice());
    let derived = compute_cmac(&message, cmac_key.as_slice())?;

    Ok(truncate_key(&derived))
}

fn validate_master_key(master_key: &[u8]) -> Result<()> {
    if master_key.len() < MASTER_KEY_MIN_LENGTH || master_key.len() > MASTER_KEY_MAX_LENGTH {
        return Err(Error::InvalidArgument("master key length"));
    }
    Ok(())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidInput)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn truncate_key(digest: &[u8]) -> Aes128Key {
    let mut key = [0; Aes128Key::LENGTH];
    key.copy_from_slice(&digest[..Aes128Key::LENGTH]);
    Aes128Key::from(key)
}
