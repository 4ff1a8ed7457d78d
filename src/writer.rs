//! The write side: envelope and frame emission.
//!
//! A nested set is serialized by topologically sorting its sub-graph and
//! writing one frame per distinct node, children first. As each frame's
//! body is produced it streams through [`HashingWriter`], so the node's
//! digest is ready the moment its bytes are; the digest is recorded in a
//! per-call identity table keyed by node address. When a branch higher in
//! the graph is encoded, every edge to an already-written node is replaced
//! by that node's digest. A shared sub-graph therefore costs one frame no
//! matter how many parents reference it.
//!
//! Frame layout on the wire, all varints shortest-form:
//!
//! ```text
//! [digest_len=16: varint][digest: 16 bytes][body_len: varint][body]
//! ```
//!
//! The digest covers the body bytes only, never the frame header.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::io::Write;
use std::sync::Arc;

use twox_hash::XxHash64;

use crate::digest::{Digest, HashingWriter, DIGEST_LEN};
use crate::error::{CodecError, Result};
use crate::payload::PayloadCodec;
use crate::set::{Entry, NestedSet, Node};
use crate::topo::topological_order;
use crate::varint::write_varint;

/// The writer's per-call node-to-digest table, keyed by handle identity.
type IdentityTable = HashMap<usize, Digest, BuildHasherDefault<XxHash64>>;

fn node_key<T>(node: &Arc<Node<T>>) -> usize {
    Arc::as_ptr(node) as usize
}

/// Serializes `set` onto `out`: a varint node count, the order ordinal, and
/// the frames in topological order.
///
/// An empty set is emitted as a single frame whose body is `varint(0)`;
/// callers that can represent emptiness out-of-band are expected to
/// short-circuit before getting here.
pub fn write_nested_set<T, C, W>(out: &mut W, set: &NestedSet<T>, payload: &C) -> Result<()>
where
    C: PayloadCodec<T>,
    W: Write,
{
    let Some(root) = set.children() else {
        write_varint(1, out)?;
        write_varint(set.order().ordinal(), out)?;
        write_empty_frame(out)?;
        tracing::debug!(order = ?set.order(), "serialized empty nested set");
        return Ok(());
    };

    let nodes = topological_order(root)?;
    write_varint(nodes.len() as u64, out)?;
    write_varint(set.order().ordinal(), out)?;

    let mut table = IdentityTable::default();
    for (index, node) in nodes.iter().enumerate() {
        write_frame(out, node, index, &mut table, payload)?;
    }

    tracing::debug!(frames = nodes.len(), order = ?set.order(), "serialized nested set");
    Ok(())
}

fn write_empty_frame<W: Write>(out: &mut W) -> Result<()> {
    let mut body = Vec::new();
    let mut hashing = HashingWriter::new(&mut body);
    write_varint(0, &mut hashing)?;
    let digest = hashing.finish();
    emit_frame(out, &digest, &body)
}

fn write_frame<T, C, W>(
    out: &mut W,
    node: &Arc<Node<T>>,
    index: usize,
    table: &mut IdentityTable,
    payload: &C,
) -> Result<()>
where
    C: PayloadCodec<T>,
    W: Write,
{
    let mut body = Vec::new();
    let mut hashing = HashingWriter::new(&mut body);

    match node.as_ref() {
        Node::Leaf(item) => {
            write_varint(1, &mut hashing)?;
            payload
                .encode(item, &mut hashing)
                .map_err(|source| CodecError::Payload { frame: index, source: source.into() })?;
        }
        Node::Branch(entries) => {
            write_varint(entries.len() as u64, &mut hashing)?;
            for entry in entries {
                match entry {
                    Entry::Transitive(child) => {
                        // Topological order guarantees the child was framed.
                        let digest = table
                            .get(&node_key(child))
                            .copied()
                            .ok_or(CodecError::OrderingViolation)?;
                        hashing.write_all(&[1])?;
                        write_digest(&mut hashing, &digest)?;
                    }
                    Entry::Direct(item) => {
                        hashing.write_all(&[0])?;
                        payload.encode(item, &mut hashing).map_err(|source| {
                            CodecError::Payload { frame: index, source: source.into() }
                        })?;
                    }
                }
            }
        }
    }

    let digest = hashing.finish();
    table.insert(node_key(node), digest);
    emit_frame(out, &digest, &body)
}

fn write_digest<W: Write + ?Sized>(out: &mut W, digest: &Digest) -> Result<()> {
    write_varint(DIGEST_LEN as u64, out)?;
    out.write_all(digest.as_bytes())?;
    Ok(())
}

fn emit_frame<W: Write>(out: &mut W, digest: &Digest, body: &[u8]) -> Result<()> {
    write_digest(out, digest)?;
    write_varint(body.len() as u64, out)?;
    out.write_all(body)?;
    Ok(())
}
