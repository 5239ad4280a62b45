mod common;

use std::fs;
use serde_json::json;
use shardkeep::{DocId, ErrorKind, IndexPath};
use common::init_test_env;

#[test]
fn scrub_drops_unreadable_documents_and_keeps_indexes() {
    // three shards: documents 1, 2, 3 live on shards 1, 2, 0
    let env = init_test_env(3);
    env.create_visible("c");
    let path = IndexPath::new(["a"]);
    env.coordinator.index("c", &path).unwrap();
    env.insert("c", 1, json!({"a": 1}));
    env.insert("c", 2, json!({"a": "corrupt"}));
    env.insert("c", 3, json!({"a": 3}));

    // damage the only record on shard 2
    let docs_file = env.shard_dir(2).join("c").join("docs.dat");
    let mut data = fs::read(&docs_file).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0xff;
    fs::write(&docs_file, data).unwrap();

    env.coordinator.scrub("c").unwrap();

    assert_eq!(env.coordinator.all_cols(), vec!["c".to_string()]);
    let docs = env.docs("c");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[&1], json!({"a": 1}));
    assert_eq!(docs[&3], json!({"a": 3}));

    assert_eq!(env.coordinator.all_indexes("c").unwrap(), vec![path.clone()]);
    assert_eq!(env.coordinator.lookup("c", &path, &json!(1)).unwrap(), vec![DocId(1)]);
    assert_eq!(env.coordinator.lookup("c", &path, &json!(3)).unwrap(), vec![DocId(3)]);
    assert!(env.coordinator.lookup("c", &path, &json!("corrupt")).unwrap().is_empty());

    for shard in 0..3 {
        let leftovers: Vec<_> = fs::read_dir(env.shard_dir(shard))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("scrub-"))
            .collect();
        assert!(leftovers.is_empty(), "temp collection left on shard {}", shard);
    }
}

#[test]
fn scrub_of_healthy_collection_keeps_everything() {
    let env = init_test_env(2);
    env.create_visible("logs");
    env.coordinator.index("logs", &IndexPath::new(["level"])).unwrap();
    env.coordinator.index("logs", &IndexPath::new(["ctx", "user"])).unwrap();
    for id in 0..20 {
        let level = if id % 2 == 0 { "info" } else { "warn" };
        env.insert("logs", id, json!({"level": level, "ctx": {"user": id}}));
    }
    let before = env.docs("logs");

    env.coordinator.scrub("logs").unwrap();

    assert_eq!(env.docs("logs"), before);
    assert_eq!(env.coordinator.all_indexes_joint_paths("logs").unwrap(), vec!["ctx!user", "level"]);
    let warn = env.coordinator.lookup("logs", &IndexPath::new(["level"]), &json!("warn")).unwrap();
    assert_eq!(warn.len(), 10);
}

#[test]
fn scrub_of_unknown_collection_fails_before_touching_shards() {
    let env = init_test_env(2);
    let err = env.coordinator.scrub("ghost").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.context.contains("resolve"), "{}", err);
    assert!(env.coordinator.all_cols().is_empty());
}
