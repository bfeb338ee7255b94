//! Kronos Cryptography
//!
//! Node key material, authenticated layer sealing, and onion packet
//! construction and peeling.

mod encrypt;
mod keys;
mod onion;

pub use encrypt::*;
pub use keys::*;
pub use onion::*;
