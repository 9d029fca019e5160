use std::path::PathBuf;

use cluster_nav::labels::content_signature;
use cluster_nav::prelude::*;

fn scratch_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cluster-nav-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("labels.json");
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn labels_and_tags_survive_reopen() {
    let path = scratch_file("reopen");
    {
        let store = ClusterLabelStore::open(&path).unwrap();
        store
            .upsert_label("d_9", "Researchers", Some("#aa3366"), None, LabelProvenance::User)
            .unwrap();
        let sig = content_signature(&["acct2", "acct0"]);
        store
            .upsert_label(&sig, "Mixed", None, Some("group label"), LabelProvenance::Auto)
            .unwrap();
        store.add_tag("me", "acct1", "friends", Polarity::In).unwrap();
        store.add_tag("me", "acct2", "friends", Polarity::NotIn).unwrap();
    }
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = ClusterLabelStore::open(&path).unwrap();
    let label = reopened.get_label("d_9").unwrap();
    assert_eq!(label.name, "Researchers");
    assert_eq!(label.color.as_deref(), Some("#aa3366"));
    assert_eq!(label.provenance, LabelProvenance::User);
    assert_eq!(reopened.list_labels().len(), 2);
    // signatures do not depend on member order
    let sig = content_signature(&["acct0", "acct2"]);
    assert_eq!(reopened.get_label(&sig).unwrap().name, "Mixed");

    let tags = reopened.tags_for("me", "acct2");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].polarity, Polarity::NotIn);

    assert!(reopened.delete_label("d_9").unwrap());
    assert!(!reopened.delete_label("d_9").unwrap());
    assert!(reopened.remove_tag("me", "acct1", "friends").unwrap());
    drop(reopened);

    let last = ClusterLabelStore::open(&path).unwrap();
    assert!(last.get_label("d_9").is_none());
    assert!(last.tags_for("me", "acct1").is_empty());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn corrupt_file_is_a_persistence_error() {
    let path = scratch_file("corrupt");
    std::fs::write(&path, b"{ not json").unwrap();
    let err = ClusterLabelStore::open(&path).err().unwrap();
    assert_eq!(err.reason(), "persistence");
    let _ = std::fs::remove_file(&path);
}
