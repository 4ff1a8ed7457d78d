//! Concurrent deserialization against one shared interner.

use std::sync::Arc;

use depcode::{payload::Bincode, Codec, Entry, Interner, NestedSet, Node, Order};
use rayon::prelude::*;

fn shared_node() -> Arc<Node<String>> {
    Arc::new(Node::Branch(vec![
        Entry::Direct("p".to_string()),
        Entry::Direct("q".to_string()),
    ]))
}

#[test]
fn parallel_reads_converge_on_one_node() {
    let codec = Codec::with_interner(Bincode, Arc::new(Interner::new()));
    let shared = shared_node();

    let blobs: Vec<Vec<u8>> = (0..64)
        .map(|i| {
            let set = NestedSet::from_entries(
                Order::Stable,
                vec![
                    Entry::Transitive(Arc::clone(&shared)),
                    Entry::Direct(format!("root{i}")),
                ],
            );
            let mut blob = Vec::new();
            codec.write(&mut blob, &set).unwrap();
            blob
        })
        .collect();

    // All 64 reads race on the shared sub-graph's digest; every winner and
    // loser must end up holding the same node.
    let results: Vec<NestedSet<String>> = blobs
        .par_iter()
        .map(|blob| codec.read(&mut blob.as_slice()).unwrap())
        .collect();

    let reference = first_child(&results[0]);
    for set in &results[1..] {
        assert!(Arc::ptr_eq(&reference, &first_child(set)));
    }
}

#[test]
fn parallel_reads_of_disjoint_blobs_do_not_interfere() {
    let codec = Codec::with_interner(Bincode, Arc::new(Interner::new()));

    let blobs: Vec<Vec<u8>> = (0..64)
        .map(|i| {
            let set = NestedSet::from_entries(
                Order::Stable,
                vec![
                    Entry::Direct(format!("a{i}")),
                    Entry::Direct(format!("b{i}")),
                ],
            );
            let mut blob = Vec::new();
            codec.write(&mut blob, &set).unwrap();
            blob
        })
        .collect();

    let results: Vec<NestedSet<String>> = blobs
        .par_iter()
        .map(|blob| codec.read(&mut blob.as_slice()).unwrap())
        .collect();

    for (i, set) in results.iter().enumerate() {
        match set.children().unwrap().as_ref() {
            Node::Branch(entries) => {
                assert!(matches!(&entries[0], Entry::Direct(item) if *item == format!("a{i}")));
            }
            other => panic!("expected branch, got {other:?}"),
        }
    }
}

fn first_child(set: &NestedSet<String>) -> Arc<Node<String>> {
    match set.children().expect("set is empty").as_ref() {
        Node::Branch(entries) => match &entries[0] {
            Entry::Transitive(node) => Arc::clone(node),
            other => panic!("expected reference, got {other:?}"),
        },
        other => panic!("expected branch, got {other:?}"),
    }
}
