//! Topological ordering of a root's sub-graph.
//!
//! The writer needs every node to appear after all nodes it references, so
//! a child's digest is known by the time any parent is encoded. The order
//! produced here is a post-order depth-first traversal that descends into
//! entries in their stored order, deduplicated by node identity; ties are
//! broken by first visit. The root is always the last element.
//!
//! The traversal uses an explicit stack. Chains thousands of nodes deep
//! must not overflow the call stack.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

use twox_hash::XxHash64;

use crate::error::{CodecError, Result};
use crate::set::{Entry, Node};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

enum Step<'a, T> {
    Enter(&'a Arc<Node<T>>),
    Exit(&'a Arc<Node<T>>),
}

/// Returns all distinct nodes reachable from `root`, children before
/// parents, root last. Payload entries carry no edges; only references to
/// other nodes induce order.
///
/// A cycle among references fails with
/// [`InvariantViolation`](CodecError::InvariantViolation). Well-formed
/// graphs built from immutable handles cannot contain one.
pub fn topological_order<T>(root: &Arc<Node<T>>) -> Result<Vec<Arc<Node<T>>>> {
    let mut marks: HashMap<usize, Mark, BuildHasherDefault<XxHash64>> = HashMap::default();
    let mut order = Vec::new();
    let mut stack = vec![Step::Enter(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => {
                let key = Arc::as_ptr(node) as usize;
                match marks.get(&key) {
                    Some(Mark::Done) => continue,
                    Some(Mark::InProgress) => {
                        return Err(CodecError::InvariantViolation(
                            "cycle among branch references".to_string(),
                        ));
                    }
                    None => {}
                }
                marks.insert(key, Mark::InProgress);
                stack.push(Step::Exit(node));
                if let Node::Branch(entries) = node.as_ref() {
                    // Reversed pushes so children pop in stored order.
                    for entry in entries.iter().rev() {
                        if let Entry::Transitive(child) = entry {
                            stack.push(Step::Enter(child));
                        }
                    }
                }
            }
            Step::Exit(node) => {
                marks.insert(Arc::as_ptr(node) as usize, Mark::Done);
                order.push(Arc::clone(node));
            }
        }
    }

    Ok(order)
}
