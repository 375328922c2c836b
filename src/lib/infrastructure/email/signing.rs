//! Request signing for the cloud email APIs.
//!
//! Both algorithms are pure functions of their inputs, so a given request
//! always produces the same signature.

pub mod rpc;
pub mod tc3;

use hmac::{digest::KeyInit, Mac};

/// Returns a MAC keyed with `key`.
fn keyed<M: Mac + KeyInit>(key: &[u8]) -> M {
    // HMAC hashes or pads the key, so no key length is ever rejected.
    <M as KeyInit>::new_from_slice(key).expect("HMAC accepts keys of any length")
}
