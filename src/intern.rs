//! The process-wide digest interner.
//!
//! Deserialization restores sharing *within* one blob through a local
//! digest table, but sharing *across* blobs (and across threads reading
//! different blobs) needs process-wide state: a concurrent map from digest
//! to the children node previously materialized for it.
//!
//! Values are held weakly. An entry pins nothing; it vanishes as soon as no
//! caller keeps the node alive, so the interner's footprint is bounded by
//! the live graph plus weak-reference bookkeeping. Dead entries are purged
//! opportunistically when a shard grows past a watermark.
//!
//! [`Interner::get_or_insert`] has single-winner semantics: the first
//! insert for a digest wins and concurrent losers adopt the winner's node,
//! dropping their own candidate. Because one process-wide map serves every
//! element type, values are stored type-erased; a hit whose element type
//! does not match the caller's is treated as absent and replaced.

use std::any::Any;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::Lazy;
use twox_hash::XxHash64;

use crate::digest::Digest;
use crate::set::Node;

const SHARD_COUNT: usize = 16;

/// Shard occupancy at which an insert sweeps out dead entries first.
const PURGE_WATERMARK: usize = 64;

type Erased = Weak<dyn Any + Send + Sync>;
type Shard = Mutex<HashMap<Digest, Erased, BuildHasherDefault<XxHash64>>>;

static GLOBAL: Lazy<Arc<Interner>> = Lazy::new(|| Arc::new(Interner::new()));

/// A sharded, weak-valued map from digest to deserialized children node.
#[derive(Debug)]
pub struct Interner {
    shards: Vec<Shard>,
}

impl Interner {
    /// Creates an interner with no entries.
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::default()).collect(),
        }
    }

    /// The interner shared by every codec in the process unless a caller
    /// binds its own.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    fn shard(&self, digest: &Digest) -> &Shard {
        &self.shards[digest.as_bytes()[0] as usize & (SHARD_COUNT - 1)]
    }

    /// Returns the node registered under `digest`, installing `candidate`
    /// if none is live. Atomic: concurrent callers for one digest all
    /// receive the same node.
    pub fn get_or_insert<T>(&self, digest: Digest, candidate: Arc<Node<T>>) -> Arc<Node<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut shard = self
            .shard(&digest)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if shard.len() >= PURGE_WATERMARK {
            shard.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = shard.get(&digest).and_then(Weak::upgrade) {
            match existing.downcast::<Node<T>>() {
                Ok(node) => {
                    tracing::trace!(%digest, "interner hit");
                    return node;
                }
                // Same digest, different element type. The map serves one
                // digest namespace per process, so the newcomer evicts.
                Err(_) => tracing::trace!(%digest, "interner entry has foreign element type"),
            }
        }

        let erased: Arc<dyn Any + Send + Sync> = candidate.clone();
        shard.insert(digest, Arc::downgrade(&erased));
        tracing::trace!(%digest, "interner insert");
        candidate
    }

    /// Number of entries whose value is still alive. Dead entries pending
    /// a purge are not counted.
    pub fn live_entries(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .values()
                    .filter(|weak| weak.strong_count() > 0)
                    .count()
            })
            .sum()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
