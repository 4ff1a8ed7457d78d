//! The seam between the codec and element payloads.
//!
//! The codec is parametric over the element type and makes no assumptions
//! about payload equality, hashability or size. A [`PayloadCodec`] turns
//! elements into bytes and back; its errors propagate through
//! [`CodecError::Payload`](crate::error::CodecError::Payload) unchanged.
//!
//! A payload decoder must consume exactly the bytes its encoder produced,
//! since entries are concatenated inside a frame body with no per-entry
//! length prefix. [`Bincode`] satisfies this for any serde type.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error type payload codecs surface.
pub type PayloadError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied serializer/deserializer for individual element values.
pub trait PayloadCodec<T> {
    /// Encodes one element onto `out`.
    fn encode(&self, item: &T, out: &mut dyn Write) -> Result<(), PayloadError>;

    /// Decodes one element, consuming exactly its encoding from `input`.
    fn decode(&self, input: &mut dyn Read) -> Result<T, PayloadError>;
}

/// Payload codec backed by `bincode`'s serde integration with the standard
/// configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bincode;

impl<T> PayloadCodec<T> for Bincode
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, item: &T, mut out: &mut dyn Write) -> Result<(), PayloadError> {
        bincode::serde::encode_into_std_write(item, &mut out, bincode::config::standard())?;
        Ok(())
    }

    fn decode(&self, mut input: &mut dyn Read) -> Result<T, PayloadError> {
        let item = bincode::serde::decode_from_std_read(&mut input, bincode::config::standard())?;
        Ok(item)
    }
}
