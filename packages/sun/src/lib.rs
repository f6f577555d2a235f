//! Decryption and authentication of Secure Dynamic Messaging (SDM) messages
//! emitted by NTAG 424 DNA tags.
//!
//! Each tap of a tag produces a short dynamic URL whose query parameters
//! carry an encrypted PICC data blob, an optional encrypted file payload and
//! a truncated authentication tag (SDMMAC). This crate turns that triple
//! back into the tag UID, the monotonic read counter and the plaintext file
//! bytes, provided the message is authentic. URL handling, hex codecs and
//! replay bookkeeping are the caller's concern.

pub mod diversification;
pub mod error;
pub mod message;
pub mod session;

pub use diversification::{derive_tag_key, derive_undiversified_key};
pub use error::{Error, Result};
pub use message::{
    calculate_sdmmac, decrypt_file_data, decrypt_sun_message, validate_plain_sun,
    DecryptedSunMessage, EncryptionMode, ParamMode, SunMessage, ValidatedSunMessage,
};
