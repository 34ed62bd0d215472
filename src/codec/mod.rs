//! Codec Module
//!
//! Key building and the envelope wire format.

mod envelope;
mod key;

pub use envelope::{
    current_timestamp_ms, decode, encode, CipherBinding, DecodedRecord, EncodedRecord, Envelope,
};
pub use key::{build_key, strip_namespace, NAMESPACE_SEPARATOR};
