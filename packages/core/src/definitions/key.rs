use std::array::TryFromSliceError;
use std::fmt::Debug;

/// A 16-byte AES-128 key.
///
/// `Debug` does not print the key material.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Aes128Key([u8; 16]);

impl Aes128Key {
    pub const LENGTH: usize = 16;
    pub const ZERO: Aes128Key = Aes128Key([0; Self::LENGTH]);

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Aes128Key::LENGTH]> for Aes128Key {
    fn from(value: [u8; Aes128Key::LENGTH]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Aes128Key {
    type Error = TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}

impl Debug for Aes128Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aes128Key(..)")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_debug_redacts_key_material() {
        let key = Aes128Key::from([0x2b; 16]);
        assert_eq!(format!("{key:?}"), "Aes128Key(..)");
    }

    #[test]
    fn test_try_from_slice() {
        assert!(Aes128Key::try_from([0u8; 16].as_slice()).is_ok());
        assert!(Aes128Key::try_from([0u8; 15].as_slice()).is_err());
        assert!(Aes128Key::try_from([0u8; 17].as_slice()).is_err());
    }
}
