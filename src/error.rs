//! Centralized error handling for the codec.
//!
//! All failure conditions are propagated through the crate-wide [`Result`]
//! type; the library contains no panicking paths (enforced by clippy lints
//! at the crate root).
//!
//! ## Error Categories
//!
//! - **I/O** ([`CodecError::Io`]): failures of the underlying stream.
//! - **Malformed** ([`CodecError::Malformed`]): the byte stream does not
//!   conform to the wire format (truncated input, bad varint, wrong digest
//!   length, impossible entry count).
//! - **Missing reference** ([`CodecError::MissingReference`]): an entry
//!   names a digest that no earlier frame in the blob produced. The writer's
//!   emission order makes this impossible for well-formed output, so it
//!   indicates a sender bug or corruption.
//! - **Ordering violation** ([`CodecError::OrderingViolation`]): writer
//!   internal error, a child's digest was needed before it was computed.
//! - **Payload** ([`CodecError::Payload`]): surfaced unchanged from the
//!   caller-supplied payload codec, tagged with the frame in flight.
//! - **Invariant violation** ([`CodecError::InvariantViolation`]): a cycle
//!   was encountered among branch references.
//!
//! Errors abort the current call. Partial output on the stream is not
//! rewound; a failed stream must be discarded by the caller.
//!
//! The type is `Clone` so errors can be shared across threads; I/O and
//! payload sources are wrapped in `Arc` to keep cloning cheap.

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::digest::Digest;

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// The master error enum covering all failure domains of the codec.
///
/// For [`Malformed`](CodecError::Malformed),
/// [`MissingReference`](CodecError::MissingReference) and
/// [`Payload`](CodecError::Payload) the `frame` field is the zero-based
/// index of the frame that was in flight when the failure occurred.
/// Failures while reading the envelope itself report frame `0`.
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Low-level I/O failure on the `in`/`out` stream.
    Io(Arc<io::Error>),

    /// The byte stream does not conform to the wire format.
    Malformed {
        /// Index of the frame in flight.
        frame: usize,
        /// Description of the violation.
        reason: String,
    },

    /// An entry referenced a digest absent from the local per-blob table.
    MissingReference {
        /// Index of the frame in flight.
        frame: usize,
        /// The digest that could not be resolved.
        digest: Digest,
    },

    /// Writer internal error: a child's digest was needed before any frame
    /// for that child was emitted.
    OrderingViolation,

    /// Failure surfaced from the caller-supplied payload codec.
    Payload {
        /// Index of the frame in flight.
        frame: usize,
        /// The payload codec's error, unchanged.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// A cycle was encountered among branch references.
    InvariantViolation(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed { frame, reason } => {
                write!(f, "malformed stream at frame {frame}: {reason}")
            }
            Self::MissingReference { frame, digest } => {
                write!(f, "frame {frame} references unknown digest {digest}")
            }
            Self::OrderingViolation => {
                write!(f, "child digest not available; frames emitted out of order")
            }
            Self::Payload { frame, source } => {
                write!(f, "payload codec failed at frame {frame}: {source}")
            }
            Self::InvariantViolation(s) => write!(f, "invariant violation: {s}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Payload { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
