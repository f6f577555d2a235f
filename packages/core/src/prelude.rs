pub use crate::definitions::*;
pub use crate::security::{CryptoError, CryptoResult};
