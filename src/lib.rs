//! # Depcode
//!
//! A serializer/deserializer for immutable, deeply shared, DAG-structured
//! nested-set collections of the kind a build system threads through its
//! intermediate data.
//!
//! ## Overview
//!
//! A nested set is a rooted directed acyclic graph: leaves carry element
//! payloads, internal nodes denote unions of their children, and the same
//! sub-graph is typically referenced from many roots. Serializing such a
//! graph naively duplicates shared sub-DAGs exponentially and, worse,
//! loses the sharing that callers depend on for memory footprint and
//! pointer-equality fast paths. This crate keeps the sharing intact on
//! both sides of the wire:
//!
//! *   **Content addressing:** every sub-graph node is identified by the
//!     MD5 digest of its canonical byte encoding.
//! *   **Topological emission:** nodes are written children-first, so a
//!     child's digest is always known before any parent referencing it is
//!     encoded. A shared sub-graph costs exactly one frame per blob.
//! *   **Process-wide interning:** a weak-valued concurrent map from
//!     digest to materialized node guarantees at most one live copy of
//!     each distinct sub-graph per process, across independent
//!     deserializations on any number of threads.
//!
//! ## Wire Format
//!
//! ```text
//! envelope := count:varint  order:varint  frame{count}
//! frame    := digest:bytes(16, length-prefixed)  body:bytes(length-prefixed)
//! body     := k:varint
//!             k == 0:  (empty children)
//!             k == 1:  payload
//!             k >= 2:  entry{k}
//! entry    := is_ref:byte(0|1)
//!             is_ref: digest:bytes(16, length-prefixed)
//!             else:   payload
//! ```
//!
//! All varints are protobuf-style and shortest-form; the digest covers the
//! body bytes only. The envelope always carries at least one frame, and
//! the reader refuses `count == 0`; callers with an out-of-band way to
//! represent emptiness are expected to short-circuit empty sets before
//! invoking the codec.
//!
//! ## Structure
//!
//! Element payloads are opaque to the codec: a caller-supplied
//! [`PayloadCodec`] encodes and decodes them, and [`payload::Bincode`]
//! covers any serde type. Equality of nested sets is handle identity of
//! their children nodes, not structural comparison; the interner is what
//! makes identity line up with content after deserialization.
//!
//! The codec is synchronous, spawns no tasks, and holds no lock while
//! calling into the payload codec. The only shared state is the interner.
//!
//! ## Error Handling
//!
//! Every failure surfaces as a single [`CodecError`] naming its kind and,
//! for stream-shape and payload failures, the frame in flight. There are
//! no panicking paths in the library; partial output from a failed write
//! must be discarded by the caller.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod api;
pub mod digest;
pub mod error;
pub mod intern;
pub mod payload;
pub mod set;

mod reader;
mod topo;
mod varint;
mod writer;

pub use api::{serialization_enabled, set_serialization_enabled, Codec};
pub use digest::{Digest, DIGEST_LEN};
pub use error::{CodecError, Result};
pub use intern::Interner;
pub use payload::PayloadCodec;
pub use set::{Entry, NestedSet, Node, Order};
