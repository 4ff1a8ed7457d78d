//! The read side: envelope and frame consumption.
//!
//! Frames arrive in the writer's topological order, so every digest an
//! entry references was produced by an earlier frame in the same blob. A
//! local digest table accumulates those results; the node built by the
//! final frame is the root.
//!
//! After a frame's body parses, the process-wide interner is consulted
//! under the frame's declared digest. On a hit the freshly built node is
//! discarded in favor of the interned one, which is what restores sharing
//! across blobs and across threads. The declared digest is trusted as the
//! interning key; it is not recomputed from the body. The digest is a
//! content-addressed name from a trusted sender, not an authenticator, and
//! recomputing would double the hashing cost of every read.
//!
//! The interner is never polluted by failed reads: a node is registered
//! only once its frame has parsed completely.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::io::{self, Read};
use std::sync::Arc;

use twox_hash::XxHash64;

use crate::digest::{Digest, DIGEST_LEN};
use crate::error::{CodecError, Result};
use crate::intern::Interner;
use crate::payload::PayloadCodec;
use crate::set::{Entry, NestedSet, Node, Order};
use crate::varint::read_varint;

/// The per-call table mapping each frame's digest to its chosen node.
/// `None` marks the empty children, which is never interned.
type LocalTable<T> = HashMap<Digest, Option<Arc<Node<T>>>, BuildHasherDefault<XxHash64>>;

/// Stream errors while a frame is in flight: truncation and bad varints
/// are wire-format violations, everything else is a real I/O failure.
fn stream_error(frame: usize, err: io::Error) -> CodecError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => CodecError::Malformed {
            frame,
            reason: "truncated input".to_string(),
        },
        io::ErrorKind::InvalidData => CodecError::Malformed { frame, reason: err.to_string() },
        _ => CodecError::Io(err.into()),
    }
}

fn malformed(frame: usize, reason: impl Into<String>) -> CodecError {
    CodecError::Malformed { frame, reason: reason.into() }
}

/// Deserializes one nested set from `input`.
///
/// Equal sub-graphs already materialized anywhere in the process resolve
/// to the existing nodes through `interner`, provided they are still live.
pub fn read_nested_set<T, C, R>(input: &mut R, payload: &C, interner: &Interner) -> Result<NestedSet<T>>
where
    T: Send + Sync + 'static,
    C: PayloadCodec<T>,
    R: Read,
{
    let count = read_varint(input).map_err(|e| stream_error(0, e))?;
    if count == 0 {
        return Err(malformed(0, "envelope declares zero frames"));
    }
    let count = usize::try_from(count).map_err(|_| malformed(0, "frame count exceeds usize"))?;

    let ordinal = read_varint(input).map_err(|e| stream_error(0, e))?;
    let order = Order::from_ordinal(ordinal)
        .ok_or_else(|| malformed(0, format!("unknown order ordinal {ordinal}")))?;

    let mut local = LocalTable::<T>::default();
    let mut last = None;
    for frame in 0..count {
        let (digest, children) = read_frame(input, payload, interner, frame, &local)?;
        local.insert(digest, children.clone());
        last = Some(children);
    }

    tracing::debug!(frames = count, order = ?order, "deserialized nested set");

    // count >= 1, so the loop ran at least once.
    let root = last.ok_or_else(|| {
        CodecError::InvariantViolation("no frame produced a root".to_string())
    })?;
    Ok(NestedSet::from_children(order, root))
}

/// Reads one frame and returns its declared digest with the node chosen
/// for it (the interned survivor on a hit, the freshly built node
/// otherwise).
fn read_frame<T, C, R>(
    input: &mut R,
    payload: &C,
    interner: &Interner,
    frame: usize,
    local: &LocalTable<T>,
) -> Result<(Digest, Option<Arc<Node<T>>>)>
where
    T: Send + Sync + 'static,
    C: PayloadCodec<T>,
    R: Read,
{
    let digest = read_digest(input, frame)?;

    let body_len = read_varint(input).map_err(|e| stream_error(frame, e))?;
    let body_len =
        usize::try_from(body_len).map_err(|_| malformed(frame, "body length exceeds usize"))?;
    let mut body = vec![0u8; body_len];
    input
        .read_exact(&mut body)
        .map_err(|e| stream_error(frame, e))?;

    let children = parse_body(&body, payload, frame, local)?;

    let chosen = children.map(|node| interner.get_or_insert(digest, node));
    Ok((digest, chosen))
}

fn read_digest<R: Read + ?Sized>(input: &mut R, frame: usize) -> Result<Digest> {
    let len = read_varint(input).map_err(|e| stream_error(frame, e))?;
    if len != DIGEST_LEN as u64 {
        return Err(malformed(frame, format!("digest length {len}, expected {DIGEST_LEN}")));
    }
    let mut bytes = [0u8; DIGEST_LEN];
    input
        .read_exact(&mut bytes)
        .map_err(|e| stream_error(frame, e))?;
    Ok(Digest::from_bytes(bytes))
}

fn parse_body<T, C>(
    body: &[u8],
    payload: &C,
    frame: usize,
    local: &LocalTable<T>,
) -> Result<Option<Arc<Node<T>>>>
where
    C: PayloadCodec<T>,
{
    let mut cursor = body;

    let k = read_varint(&mut cursor).map_err(|e| stream_error(frame, e))?;
    let node = match k {
        0 => None,
        1 => {
            let item = payload
                .decode(&mut cursor)
                .map_err(|source| CodecError::Payload { frame, source: source.into() })?;
            Some(Arc::new(Node::Leaf(item)))
        }
        _ => {
            let k = usize::try_from(k).map_err(|_| malformed(frame, "entry count exceeds usize"))?;
            // Every entry takes at least its tag byte.
            if k > body.len() {
                return Err(malformed(frame, format!("impossible entry count {k}")));
            }
            let mut entries = Vec::with_capacity(k);
            for _ in 0..k {
                entries.push(read_entry(&mut cursor, payload, frame, local)?);
            }
            Some(Arc::new(Node::Branch(entries)))
        }
    };

    if !cursor.is_empty() {
        return Err(malformed(frame, format!("{} trailing bytes in body", cursor.len())));
    }
    Ok(node)
}

fn read_entry<T, C>(
    cursor: &mut &[u8],
    payload: &C,
    frame: usize,
    local: &LocalTable<T>,
) -> Result<Entry<T>>
where
    C: PayloadCodec<T>,
{
    let mut tag = [0u8; 1];
    cursor
        .read_exact(&mut tag)
        .map_err(|e| stream_error(frame, e))?;
    match tag[0] {
        0 => {
            let item = payload
                .decode(cursor)
                .map_err(|source| CodecError::Payload { frame, source: source.into() })?;
            Ok(Entry::Direct(item))
        }
        1 => {
            let digest = read_digest(cursor, frame)?;
            match local.get(&digest) {
                Some(Some(node)) => Ok(Entry::Transitive(Arc::clone(node))),
                // The empty children is never referenced by digest.
                Some(None) => Err(malformed(frame, "entry references the empty children")),
                None => Err(CodecError::MissingReference { frame, digest }),
            }
        }
        other => Err(malformed(frame, format!("entry tag {other}, expected 0 or 1"))),
    }
}
