use std::cell::RefCell;
use std::rc::Rc;

use plistdoc::{Array, ChangeAction, ChangeEvent, Dictionary, Error, Node, NodeType, TreeError};

/// Records the action and key of every event delivered to `node`.
fn record(node: &Node) -> Rc<RefCell<Vec<(ChangeAction, Option<String>)>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    node.subscribe(move |event: &ChangeEvent| {
        sink.borrow_mut().push((event.action, event.key.clone()));
    });
    events
}

#[test]
fn test_ownership() {
    let _ = pretty_env_logger::try_init();
    let root = Dictionary::new();
    let child = Array::new();
    root.set("child", child.node().clone()).unwrap();
    assert!(child.parent().unwrap().ptr_eq(&root));
    assert_eq!(child.key(), Some(String::from("child")));

    // A node has at most one parent.
    let elsewhere = Dictionary::new();
    match elsewhere.set("child", child.node().clone()) {
        Err(Error::Tree(TreeError::AlreadyParented)) => {}
        other => panic!("unexpected result {:?}", other),
    }

    // A container cannot be placed beneath itself.
    match child.add(root.node().clone()) {
        Err(Error::Tree(TreeError::WouldCreateCycle)) => {}
        other => panic!("unexpected result {:?}", other),
    }

    match root.add("child", Node::boolean(true)) {
        Err(Error::Tree(TreeError::DuplicateKey(key))) => assert_eq!(key, "child"),
        other => panic!("unexpected result {:?}", other),
    }

    match child.insert(3, Node::number(1)) {
        Err(Error::Tree(TreeError::IndexOutOfRange { index: 3, len: 0 })) => {}
        other => panic!("unexpected result {:?}", other),
    }

    // Detaching frees the node for another container.
    child.node().remove().unwrap();
    assert!(child.parent().is_none());
    assert!(!root.contains_key("child"));
    elsewhere.set("child", child.into()).unwrap();

    match Node::number(1).remove() {
        Err(Error::Tree(TreeError::NotParented)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_replace_orphans_previous_child() {
    let root = Dictionary::new();
    let first = Node::string("first");
    root.set("value", first.clone()).unwrap();
    let second = Node::number(2);
    first.replace(second.clone()).unwrap();

    assert!(first.parent().is_none());
    assert!(second.parent().unwrap().ptr_eq(&root));
    assert_eq!(root.get_as::<i32>("value"), Some(2));
}

#[test]
fn test_events_bubble() {
    let root = Dictionary::new();
    let modes = root.get_array("modes").unwrap();
    let root_events = record(&root);
    let array_events = record(&modes);

    modes.add(Node::string("audio")).unwrap();
    assert_eq!(*array_events.borrow(), vec![(ChangeAction::Added, None)]);
    assert_eq!(*root_events.borrow(), vec![(ChangeAction::Changed, Some(String::from("modes")))]);

    root.remove("modes");
    modes.add(Node::string("location")).unwrap();
    assert_eq!(root_events.borrow().len(), 2);
    assert_eq!(root_events.borrow()[1], (ChangeAction::Removed, Some(String::from("modes"))));
}

#[test]
fn test_leaf_assignment_notifies() {
    let root = Dictionary::new();
    root.set("version", Node::string("1.0")).unwrap();
    let events = record(&root);

    let version = root.get_string("version").unwrap();
    version.set_string("1.1").unwrap();
    assert_eq!(root.get_as::<String>("version"), Some(String::from("1.1")));
    assert_eq!(*events.borrow(), vec![(ChangeAction::Changed, Some(String::from("version")))]);

    match version.set_number(3) {
        Err(Error::Tree(TreeError::KindMismatch { expected: NodeType::Number, found: NodeType::String })) => {}
        other => panic!("unexpected result {:?}", other),
    }
    assert!(version.try_set_from_str(""));
    assert_eq!(version.as_string(), Some(String::new()));
}

#[test]
fn test_try_set_from_str() {
    let number = Node::number(0);
    assert!(number.try_set_from_str(" 42 "));
    assert_eq!(number.as_i32(), Some(42));
    assert!(!number.try_set_from_str("forty"));
    assert_eq!(number.as_i32(), Some(42));

    let flag = Node::boolean(false);
    assert!(flag.try_set_from_str("TRUE"));
    assert_eq!(flag.as_bool(), Some(true));
    assert!(!flag.try_set_from_str("yes"));

    let real = Node::real(0.0);
    assert!(real.try_set_from_str("2.25"));
    assert_eq!(real.as_f64(), Some(2.25));
    assert!(!real.try_set_from_str("-1"));

    assert!(!Node::data(vec![1]).try_set_from_str("AQ=="));
}

#[test]
fn test_batch() {
    let root = Dictionary::new();
    let events = record(&root);
    let count = root.batch(|| {
        root.set("a", Node::number(1)).unwrap();
        root.set("b", Node::number(2)).unwrap();
        root.get_array("c").unwrap().assign_string_list("x y,z");
        root.len()
    });
    assert_eq!(count, 3);
    assert_eq!(*events.borrow(), vec![(ChangeAction::Changed, None)]);
    assert_eq!(root.get_as::<Array>("c").unwrap().to_string_list(), "x, y, z");
}

#[test]
fn test_change_key_keeps_position() {
    let root: Dictionary = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>first</key>
	<integer>1</integer>
	<key>second</key>
	<integer>2</integer>
	<key>third</key>
	<integer>3</integer>
</dict>
</plist>
"#.parse().unwrap();
    let events = record(&root);

    let second = root.get("second").unwrap();
    assert!(root.change_key(&second, "renamed").unwrap());
    assert_eq!(root.keys(), vec!["first", "renamed", "third"]);
    assert_eq!(
        *events.borrow(),
        vec![
            (ChangeAction::Removed, Some(String::from("second"))),
            (ChangeAction::Added, Some(String::from("renamed"))),
        ]
    );

    // Renaming onto an existing key or a foreign node does nothing.
    assert!(!root.change_key(&second, "first").unwrap());
    assert!(!root.change_key(&Node::number(2), "other").unwrap());

    let replacement = Node::string("two");
    assert!(root.change_key_with(&second, "second", Some(replacement.clone())).unwrap());
    assert_eq!(root.keys(), vec!["first", "second", "third"]);
    assert!(second.parent().is_none());
    assert!(replacement.parent().unwrap().ptr_eq(&root));
}

#[test]
fn test_insert_after() {
    let root = Dictionary::new();
    root.set("a", Node::number(1)).unwrap();
    root.set("c", Node::number(3)).unwrap();
    root.insert_after("a", "b", Node::number(2)).unwrap();
    root.insert_after("missing", "first", Node::number(0)).unwrap();
    assert_eq!(root.keys(), vec!["first", "a", "b", "c"]);
}

#[test]
fn test_get_or_create() {
    let root = Dictionary::new();
    root.set("name", Node::number(7)).unwrap();

    // A child of the wrong kind is replaced.
    let name = root.get_string("name").unwrap();
    assert_eq!(name.as_string(), Some(String::new()));
    assert_eq!(root.get("name").unwrap().node_type(), NodeType::String);

    let list = root.get_array("list").unwrap();
    list.add(Node::string("one")).unwrap();
    assert!(root.get_array("list").unwrap().ptr_eq(&list));
    assert_eq!(root.get_as::<Array>("list").unwrap().len(), 1);

    root.set_string("name", "value").unwrap();
    assert!(root.get("name").unwrap().ptr_eq(&name));
    assert_eq!(name.as_string(), Some(String::from("value")));
}

#[test]
fn test_array_operations() {
    let array = Array::new();
    for word in &["pear", "apple", "fig"] {
        array.add(Node::string(*word)).unwrap();
    }
    let events = record(&array);

    array.sort_by(|a, b| a.as_string().cmp(&b.as_string()));
    assert_eq!(array.to_string_vec(), vec!["apple", "fig", "pear"]);

    let fig = array.get(1).unwrap();
    assert!(array.remove(&fig));
    assert!(!array.remove(&fig));
    array.insert(0, fig.clone()).unwrap();
    assert_eq!(array.remove_at(0).unwrap(), fig);
    array.clear();
    assert!(array.is_empty());

    let actions = events.borrow().iter().map(|(action, _)| *action).collect::<Vec<_>>();
    assert_eq!(
        actions,
        vec![
            ChangeAction::Changed,
            ChangeAction::Removed,
            ChangeAction::Added,
            ChangeAction::Removed,
            ChangeAction::Cleared,
        ]
    );
}

#[test]
fn test_deep_clone() {
    let root = Dictionary::new();
    let nested = root.get_array("nested").unwrap();
    nested.add(Node::data(vec![1, 2, 3])).unwrap();

    let copy = root.deep_clone().as_dictionary().unwrap();
    assert_eq!(copy, root);
    assert!(copy.parent().is_none());

    let copied = copy.get_as::<Array>("nested").unwrap();
    assert!(!copied.ptr_eq(&nested));
    assert!(copied.parent().unwrap().ptr_eq(&copy));
    copied.clear();
    assert_eq!(nested.len(), 1);
}

#[test]
fn test_from_embedded_xml() {
    let mut profile = vec![0x30, 0x82, 0x1F, 0x00, 0x06, 0x09];
    profile.extend_from_slice(br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>TeamName</key>
	<string>Example Team</string>
</dict>
</plist>"#);
    profile.extend_from_slice(&[0xA0, 0x82, 0x0D, 0xFF]);

    let embedded = Dictionary::from_embedded_xml(&profile).unwrap();
    assert_eq!(embedded.get_as::<String>("TeamName"), Some(String::from("Example Team")));

    match Dictionary::from_embedded_xml(&[0x30, 0x82]) {
        Err(Error::EmbeddedPlistNotFound) => {}
        other => panic!("unexpected result {:?}", other),
    }
}
