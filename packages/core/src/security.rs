mod cmac;
pub use cmac::*;

mod crypto;
pub use crypto::*;

mod error;
pub use error::*;

mod lrp;
pub use lrp::*;
