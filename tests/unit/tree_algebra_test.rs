//! Unit tests for the pure tree algebra: locate, remove, insert, update,
//! reindex, relocate and the lookup helpers.

#[path = "../common/mod.rs"]
mod common;

use common::{bookmark, folder, nested_tree, sample_tree, titles};
use marksync::tree;
use marksync::types::bookmark::{BookmarkNode, ROOT_ID};
use marksync::types::errors::TreeError;

// ─── locate ───

#[test]
fn test_locate_finds_nested_node() {
    let t = nested_tree();
    let leaf = tree::locate(&t, "l1").expect("l1 should be found");
    assert_eq!(leaf.parent_id(), "leaf");
    assert!(tree::locate(&t, "missing").is_none());
}

// ─── remove ───

#[test]
fn test_remove_folder_takes_subtree() {
    let t = nested_tree();
    let (rest, removed) = tree::remove(&t, "mid");
    let removed = removed.expect("mid should be removed");

    assert_eq!(removed.subtree_len(), 4);
    assert_eq!(tree::count_nodes(&rest), tree::count_nodes(&t) - 4);
    assert!(tree::locate(&rest, "l1").is_none());
    // The input snapshot is untouched.
    assert!(tree::locate(&t, "l1").is_some());
}

#[test]
fn test_remove_missing_id_returns_none() {
    let t = sample_tree();
    let (rest, removed) = tree::remove(&t, "nope");
    assert!(removed.is_none());
    assert_eq!(rest, t);
}

// ─── insert ───

#[test]
fn test_insert_sets_envelope() {
    let t = sample_tree();
    let node = bookmark("w", ROOT_ID, 9, "http://w.com");
    let out = tree::insert(&t, node, "a", 0).unwrap();

    let w = tree::locate(&out, "w").unwrap();
    assert_eq!(w.parent_id(), "a");
    assert_eq!(w.index(), 0);
}

#[test]
fn test_insert_rejects_bad_parent_and_index() {
    let t = sample_tree();
    let node = bookmark("w", ROOT_ID, 0, "http://w.com");

    assert_eq!(
        tree::insert(&t, node.clone(), "ghost", 0),
        Err(TreeError::ParentNotFound("ghost".to_string()))
    );
    assert_eq!(
        tree::insert(&t, node.clone(), "b", 4),
        Err(TreeError::IndexOutOfRange {
            parent_id: "b".to_string(),
            index: 4,
            len: 3
        })
    );
    // A bookmark is not a container.
    assert!(tree::insert(&t, node, "x", 0).is_err());
}

#[test]
fn test_insert_at_end_of_root() {
    let t = sample_tree();
    let out = tree::insert(&t, bookmark("w", ROOT_ID, 0, "http://w.com"), ROOT_ID, 2).unwrap();
    assert_eq!(titles(&out), vec!["A", "B", "W"]);
}

// ─── update ───

#[test]
fn test_update_replaces_only_target() {
    let t = sample_tree();
    let out = tree::update(&t, "y", |node| match node {
        BookmarkNode::Bookmark(b) => {
            let mut b = b.clone();
            b.title = "Why".to_string();
            BookmarkNode::Bookmark(b)
        }
        other => other.clone(),
    });

    assert_eq!(tree::locate(&out, "y").unwrap().title(), "Why");
    assert_eq!(tree::locate(&out, "x").unwrap().title(), "X");
    assert_eq!(tree::locate(&t, "y").unwrap().title(), "Y");
}

#[test]
fn test_update_missing_id_is_identity() {
    let t = sample_tree();
    assert_eq!(tree::update(&t, "ghost", |n| n.clone()), t);
}

// ─── reindex ───

#[test]
fn test_reindex_repairs_positions_and_parents() {
    let broken = vec![folder(
        "f",
        "wrong",
        7,
        vec![
            bookmark("p", "elsewhere", 5, "http://p.com"),
            bookmark("q", ROOT_ID, 5, "http://q.com"),
        ],
    )];

    let fixed = tree::reindex_root(&broken);
    let f = tree::locate(&fixed, "f").unwrap();
    assert_eq!((f.parent_id(), f.index()), (ROOT_ID, 0));
    let q = tree::locate(&fixed, "q").unwrap();
    assert_eq!((q.parent_id(), q.index()), ("f", 1));
}

// ─── relocate ───

#[test]
fn test_relocate_moves_and_reindexes() {
    let t = sample_tree();
    let (out, moved) = tree::relocate(&t, "z", "a", 0).unwrap();

    assert_eq!(moved.parent_id(), "a");
    assert_eq!(titles(tree::children_of(&out, "b").unwrap()), vec!["X", "Y"]);
    assert_eq!(tree::locate(&out, "y").unwrap().index(), 1);
}

#[test]
fn test_relocate_unknown_node() {
    let t = sample_tree();
    assert_eq!(
        tree::relocate(&t, "ghost", "a", 0).unwrap_err(),
        TreeError::NodeNotFound("ghost".to_string())
    );
}

// ─── helpers ───

#[test]
fn test_parent_map_and_ancestor_walk() {
    let t = nested_tree();
    let parents = tree::parent_map(&t);

    assert_eq!(parents.get("l1").map(String::as_str), Some("leaf"));
    assert!(tree::is_ancestor_or_self(&parents, "top", "l1"));
    assert!(tree::is_ancestor_or_self(&parents, "mid", "mid"));
    assert!(!tree::is_ancestor_or_self(&parents, "leaf", "m1"));
    assert!(!tree::is_ancestor_or_self(&parents, "mid", "top"));
}

#[test]
fn test_find_duplicate_url_excludes_self() {
    let t = sample_tree();
    assert_eq!(tree::find_duplicate_url(&t, "http://y.com", "x").map(|b| b.id.as_str()), Some("y"));
    assert!(tree::find_duplicate_url(&t, "http://y.com", "y").is_none());
    assert!(tree::find_duplicate_url(&t, "http://none.com", "x").is_none());
}

#[test]
fn test_flatten_is_preorder() {
    let t = nested_tree();
    let ids: Vec<&str> = tree::flatten(&t).iter().map(|n| n.id()).collect();
    assert_eq!(ids, vec!["solo", "top", "t1", "mid", "leaf", "l1", "m1"]);
    assert_eq!(tree::count_nodes(&t), 7);
}

#[test]
fn test_sibling_count() {
    let t = sample_tree();
    assert_eq!(tree::sibling_count(&t, ROOT_ID), Some(2));
    assert_eq!(tree::sibling_count(&t, "b"), Some(3));
    assert_eq!(tree::sibling_count(&t, "a"), Some(0));
    assert_eq!(tree::sibling_count(&t, "x"), None);
}
