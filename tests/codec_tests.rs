//! End-to-end behavior of the nested-set codec over the public API.

use std::io::{BufReader, Seek, SeekFrom, Write};
use std::sync::Arc;

use depcode::{payload::Bincode, Codec, CodecError, Entry, Interner, NestedSet, Node, Order};

/// A codec with an interner private to the test, so tests cannot observe
/// each other's interned nodes.
fn isolated() -> Codec<Bincode> {
    Codec::with_interner(Bincode, Arc::new(Interner::new()))
}

fn write_blob(codec: &Codec<Bincode>, set: &NestedSet<String>) -> Vec<u8> {
    let mut blob = Vec::new();
    codec.write(&mut blob, set).unwrap();
    blob
}

fn read_blob(codec: &Codec<Bincode>, blob: &[u8]) -> NestedSet<String> {
    codec.read(&mut &blob[..]).unwrap()
}

fn branch_entries(set: &NestedSet<String>) -> &[Entry<String>] {
    match set.children().expect("set is empty").as_ref() {
        Node::Branch(entries) => entries,
        other => panic!("expected branch, got {other:?}"),
    }
}

fn referenced(entry: &Entry<String>) -> &Arc<Node<String>> {
    match entry {
        Entry::Transitive(node) => node,
        Entry::Direct(item) => panic!("expected reference, got payload {item:?}"),
    }
}

fn direct(items: &[&str]) -> Vec<Entry<String>> {
    items.iter().map(|s| Entry::Direct(s.to_string())).collect()
}

#[test]
fn round_trip_leaf() {
    let codec = isolated();
    let set = NestedSet::leaf(Order::Stable, "x".to_string());
    let back = read_blob(&codec, &write_blob(&codec, &set));

    assert_eq!(back.order(), Order::Stable);
    match back.children().unwrap().as_ref() {
        Node::Leaf(item) => assert_eq!(item, "x"),
        other => panic!("expected leaf, got {other:?}"),
    }
}

#[test]
fn round_trip_two_element_branch() {
    let codec = isolated();
    let set = NestedSet::from_entries(Order::Compile, direct(&["a", "b"]));
    let back = read_blob(&codec, &write_blob(&codec, &set));

    assert_eq!(back.order(), Order::Compile);
    let entries = branch_entries(&back);
    assert_eq!(entries.len(), 2);
    for (entry, expected) in entries.iter().zip(["a", "b"]) {
        match entry {
            Entry::Direct(item) => assert_eq!(item, expected),
            other => panic!("expected payload, got {other:?}"),
        }
    }
}

#[test]
fn round_trip_empty_set() {
    let codec = isolated();
    let set = NestedSet::empty(Order::Link);
    let blob = write_blob(&codec, &set);
    assert!(!blob.is_empty());

    let back = read_blob(&codec, &blob);
    assert!(back.is_empty());
    assert_eq!(back.order(), Order::Link);
}

#[test]
fn shared_subgraph_restores_identity() {
    let codec = isolated();
    let shared = Arc::new(Node::Branch(direct(&["p", "q"])));
    let set = NestedSet::from_entries(
        Order::Stable,
        vec![
            Entry::Transitive(Arc::clone(&shared)),
            Entry::Transitive(shared),
            Entry::Direct("r".to_string()),
        ],
    );

    let back = read_blob(&codec, &write_blob(&codec, &set));
    let entries = branch_entries(&back);
    assert_eq!(entries.len(), 3);
    assert!(Arc::ptr_eq(referenced(&entries[0]), referenced(&entries[1])));
    match &entries[2] {
        Entry::Direct(item) => assert_eq!(item, "r"),
        other => panic!("expected payload, got {other:?}"),
    }
}

#[test]
fn diamond_restores_single_shared_node() {
    let codec = isolated();
    let a = Arc::new(Node::Leaf("1".to_string()));
    let b = Arc::new(Node::Branch(vec![
        Entry::Transitive(Arc::clone(&a)),
        Entry::Direct("2".to_string()),
    ]));
    let c = Arc::new(Node::Branch(vec![
        Entry::Transitive(Arc::clone(&a)),
        Entry::Direct("3".to_string()),
    ]));
    let set = NestedSet::from_entries(
        Order::Stable,
        vec![Entry::Transitive(b), Entry::Transitive(c)],
    );

    let back = read_blob(&codec, &write_blob(&codec, &set));
    let entries = branch_entries(&back);
    let b_back = referenced(&entries[0]);
    let c_back = referenced(&entries[1]);
    assert!(!Arc::ptr_eq(b_back, c_back));

    let a_via_b = match b_back.as_ref() {
        Node::Branch(entries) => referenced(&entries[0]),
        other => panic!("expected branch, got {other:?}"),
    };
    let a_via_c = match c_back.as_ref() {
        Node::Branch(entries) => referenced(&entries[0]),
        other => panic!("expected branch, got {other:?}"),
    };
    assert!(Arc::ptr_eq(a_via_b, a_via_c));
}

#[test]
fn mixed_branch_preserves_entry_order() {
    let codec = isolated();
    let shared = Arc::new(Node::Branch(direct(&["p", "q"])));
    let set = NestedSet::from_entries(
        Order::NaiveLink,
        vec![
            Entry::Direct("a".to_string()),
            Entry::Transitive(shared),
            Entry::Direct("b".to_string()),
        ],
    );

    let back = read_blob(&codec, &write_blob(&codec, &set));
    let entries = branch_entries(&back);
    assert!(matches!(&entries[0], Entry::Direct(item) if item == "a"));
    assert!(matches!(&entries[1], Entry::Transitive(_)));
    assert!(matches!(&entries[2], Entry::Direct(item) if item == "b"));
}

#[test]
fn serialization_is_deterministic() {
    let codec = isolated();
    let build = || {
        let shared = Arc::new(Node::Branch(direct(&["p", "q"])));
        NestedSet::from_entries(
            Order::Stable,
            vec![
                Entry::Transitive(Arc::clone(&shared)),
                Entry::Transitive(shared),
                Entry::Direct("r".to_string()),
            ],
        )
    };

    let set = build();
    assert_eq!(write_blob(&codec, &set), write_blob(&codec, &set));

    // Structurally equal but independently built graphs encode identically.
    assert_eq!(write_blob(&codec, &build()), write_blob(&codec, &build()));
}

#[test]
fn blob_bytes_do_not_depend_on_sibling_serializations() {
    let codec = isolated();
    let shared = Arc::new(Node::Branch(direct(&["p", "q"])));
    let r1 = NestedSet::from_entries(
        Order::Stable,
        vec![
            Entry::Transitive(Arc::clone(&shared)),
            Entry::Direct("r1".to_string()),
        ],
    );
    let r2 = NestedSet::from_entries(
        Order::Stable,
        vec![
            Entry::Transitive(shared),
            Entry::Direct("r2".to_string()),
        ],
    );

    let r1_first = write_blob(&codec, &r1);
    let r2_after = write_blob(&codec, &r2);
    let r2_first = write_blob(&codec, &r2);
    let r1_after = write_blob(&codec, &r1);

    assert_eq!(r1_first, r1_after);
    assert_eq!(r2_first, r2_after);
}

#[test]
fn repeated_reads_return_identical_roots() {
    let codec = isolated();
    let set = NestedSet::from_entries(Order::Stable, direct(&["a", "b"]));
    let blob = write_blob(&codec, &set);

    let first = read_blob(&codec, &blob);
    let second = read_blob(&codec, &blob);
    assert!(first.same_children(&second));
    assert_eq!(first, second);
}

#[test]
fn differing_payloads_do_not_intern_together() {
    let codec = isolated();
    let ab = read_blob(
        &codec,
        &write_blob(&codec, &NestedSet::from_entries(Order::Stable, direct(&["a", "b"]))),
    );
    let ac = read_blob(
        &codec,
        &write_blob(&codec, &NestedSet::from_entries(Order::Stable, direct(&["a", "c"]))),
    );
    assert!(!ab.same_children(&ac));
}

#[test]
fn cross_blob_sharing() {
    let codec = isolated();
    let shared = Arc::new(Node::Branch(direct(&["p", "q"])));
    let r1 = NestedSet::from_entries(
        Order::Stable,
        vec![
            Entry::Transitive(Arc::clone(&shared)),
            Entry::Direct("r1".to_string()),
        ],
    );
    let r2 = NestedSet::from_entries(
        Order::Stable,
        vec![
            Entry::Transitive(shared),
            Entry::Direct("r2".to_string()),
        ],
    );

    let blob1 = write_blob(&codec, &r1);
    let blob2 = write_blob(&codec, &r2);

    let back1 = read_blob(&codec, &blob1);
    let back2 = read_blob(&codec, &blob2);

    let shared_via_1 = referenced(&branch_entries(&back1)[0]);
    let shared_via_2 = referenced(&branch_entries(&back2)[0]);
    assert!(Arc::ptr_eq(shared_via_1, shared_via_2));
}

#[test]
fn deep_chain_round_trips() {
    let codec = isolated();
    let mut node = Arc::new(Node::Leaf("bottom".to_string()));
    for i in 0..1000 {
        node = Arc::new(Node::Branch(vec![
            Entry::Transitive(node),
            Entry::Direct(format!("level{i}")),
        ]));
    }
    let set = NestedSet::from_entries(Order::Stable, vec![Entry::Transitive(node)]);

    let back = read_blob(&codec, &write_blob(&codec, &set));

    let mut depth = 0;
    let mut cursor = Arc::clone(back.children().unwrap());
    loop {
        let next = match cursor.as_ref() {
            Node::Branch(entries) => {
                depth += 1;
                Arc::clone(referenced(&entries[0]))
            }
            Node::Leaf(item) => {
                assert_eq!(item, "bottom");
                break;
            }
        };
        cursor = next;
    }
    assert_eq!(depth, 1000);
}

#[test]
fn file_backed_round_trip() {
    let codec = isolated();
    let set = NestedSet::from_entries(Order::Compile, direct(&["a", "b", "c"]));

    let mut file = tempfile::tempfile().unwrap();
    codec.write(&mut file, &set).unwrap();
    file.flush().unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut input = BufReader::new(file);
    let back: NestedSet<String> = codec.read(&mut input).unwrap();
    assert_eq!(branch_entries(&back).len(), 3);
}

/// Payload codec whose decode always fails.
struct Unreadable;

impl depcode::PayloadCodec<String> for Unreadable {
    fn encode(
        &self,
        item: &String,
        out: &mut dyn std::io::Write,
    ) -> Result<(), depcode::payload::PayloadError> {
        Bincode.encode(item, out)
    }

    fn decode(
        &self,
        _input: &mut dyn std::io::Read,
    ) -> Result<String, depcode::payload::PayloadError> {
        Err("element store unavailable".into())
    }
}

#[test]
fn payload_errors_propagate_with_frame_index() {
    let writer = isolated();
    let set = NestedSet::leaf(Order::Stable, "x".to_string());
    let blob = write_blob(&writer, &set);

    let reader = Codec::with_interner(Unreadable, Arc::new(Interner::new()));
    let err = reader.read::<String, _>(&mut &blob[..]).unwrap_err();
    match err {
        CodecError::Payload { frame, .. } => assert_eq!(frame, 0),
        other => panic!("expected payload error, got {other:?}"),
    }
}
