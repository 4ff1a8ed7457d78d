//! The public codec facade.
//!
//! A [`Codec`] binds a payload codec to an interner, defaulting to the
//! process-wide one. The codec is synchronous and blocking with respect to
//! its streams and spawns nothing of its own; any number of threads may
//! serialize or deserialize different nested sets concurrently through the
//! same or different `Codec` values.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::intern::Interner;
use crate::payload::PayloadCodec;
use crate::set::{NestedSet, Order};
use crate::{reader, writer};

/// Process-level switch for test environments that construct the codec but
/// must not pay for real encoding.
static SERIALIZATION_ENABLED: AtomicBool = AtomicBool::new(true);

/// Whether nested-set serialization is enabled in this process.
pub fn serialization_enabled() -> bool {
    SERIALIZATION_ENABLED.load(Ordering::Relaxed)
}

/// Enables or disables nested-set serialization process-wide.
///
/// While disabled, [`Codec::write`] emits nothing and [`Codec::read`]
/// consumes nothing and returns an empty set with [`Order::Stable`]. That
/// silently discards data, so it is only suitable for unit tests that do
/// not exercise the codec's semantics.
pub fn set_serialization_enabled(enabled: bool) {
    SERIALIZATION_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Serializer/deserializer for nested sets over a caller-supplied payload
/// codec.
///
/// ## Examples
///
/// ```rust
/// use depcode::{payload::Bincode, Codec, Entry, NestedSet, Order};
///
/// let set = NestedSet::from_entries(
///     Order::Stable,
///     vec![
///         Entry::Direct("a".to_string()),
///         Entry::Direct("b".to_string()),
///     ],
/// );
///
/// let codec = Codec::new(Bincode);
/// let mut blob = Vec::new();
/// codec.write(&mut blob, &set)?;
///
/// let back: NestedSet<String> = codec.read(&mut blob.as_slice())?;
/// assert_eq!(back.order(), Order::Stable);
/// # Ok::<(), depcode::CodecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Codec<C> {
    payload: C,
    interner: Arc<Interner>,
}

impl<C> Codec<C> {
    /// A codec deduplicating through the process-wide interner.
    pub fn new(payload: C) -> Self {
        Self {
            payload,
            interner: Interner::global(),
        }
    }

    /// A codec bound to a private interner. Useful for tests and for
    /// callers that want deduplication scoped narrower than the process.
    pub fn with_interner(payload: C, interner: Arc<Interner>) -> Self {
        Self { payload, interner }
    }

    /// Serializes `set` onto `out`.
    ///
    /// Emits a varint count of distinct sub-graph nodes, the order
    /// ordinal, and one frame per node in topological order. Shared
    /// sub-graphs are emitted exactly once and referenced by digest.
    pub fn write<T, W>(&self, out: &mut W, set: &NestedSet<T>) -> Result<()>
    where
        C: PayloadCodec<T>,
        W: Write,
    {
        if !serialization_enabled() {
            return Ok(());
        }
        writer::write_nested_set(out, set, &self.payload)
    }

    /// Deserializes one nested set from `input`.
    ///
    /// Sub-graphs equal to ones still live anywhere in the interner's
    /// scope come back as the identical nodes, restoring sharing across
    /// blobs.
    pub fn read<T, R>(&self, input: &mut R) -> Result<NestedSet<T>>
    where
        T: Send + Sync + 'static,
        C: PayloadCodec<T>,
        R: Read,
    {
        if !serialization_enabled() {
            return Ok(NestedSet::empty(Order::Stable));
        }
        reader::read_nested_set(input, &self.payload, &self.interner)
    }
}
