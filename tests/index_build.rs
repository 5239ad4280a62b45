mod common;

use std::fs;
use serde_json::json;
use shardkeep::index::hash::{index_key, route};
use shardkeep::storage::shard::ShardStore;
use shardkeep::{DocId, ErrorKind, IndexPath};
use common::init_test_env;

fn entries_on_shard(dir: &std::path::Path, collection: &str, path: &IndexPath, key: u64) -> Vec<u64> {
    let store = ShardStore::open(dir).unwrap();
    let ids = store
        .use_collection(collection)
        .unwrap()
        .ht_get(path, key)
        .unwrap()
        .into_iter()
        .map(|id| id.0)
        .collect();
    store.close().unwrap();
    ids
}

#[test]
fn index_routes_existing_documents_by_value_hash() {
    let env = init_test_env(3);
    env.create_visible("people");
    env.insert("people", 1, json!({"name": "ada", "langs": [{"id": "rust"}, {"id": "ml"}]}));
    env.insert("people", 2, json!({"name": "grace", "langs": [{"id": "cobol"}]}));
    env.insert("people", 3, json!({"name": "ada"}));
    env.insert("people", 4, json!({"name": null}));

    let name = IndexPath::new(["name"]);
    let langs = IndexPath::new(["langs", "id"]);
    env.coordinator.index("people", &name).unwrap();
    env.coordinator.index("people", &langs).unwrap();

    assert_eq!(env.coordinator.lookup("people", &name, &json!("ada")).unwrap(), vec![DocId(1), DocId(3)]);
    assert_eq!(env.coordinator.lookup("people", &name, &json!("grace")).unwrap(), vec![DocId(2)]);
    assert_eq!(env.coordinator.lookup("people", &langs, &json!("ml")).unwrap(), vec![DocId(1)]);
    assert!(env.coordinator.lookup("people", &name, &json!(null)).unwrap().is_empty());

    // entries sit on hash(value) % N, whatever the document's home shard
    let key = index_key(&json!("ada")).unwrap();
    let owner = route(key, 3);
    for shard in 0..3 {
        let found = entries_on_shard(&env.shard_dir(shard), "people", &name, key);
        if shard == owner {
            assert_eq!(found, vec![1, 3]);
        } else {
            assert!(found.is_empty());
        }
    }
}

#[test]
fn reindexing_places_entries_identically() {
    let env = init_test_env(4);
    env.create_visible("tags");
    let words = ["red", "green", "blue", "cyan", "magenta", "yellow"];
    for (id, word) in words.iter().enumerate() {
        env.insert("tags", id as u64, json!({"w": word}));
    }

    let path = IndexPath::new(["w"]);
    let placement = |env: &common::TestEnv| -> Vec<Vec<u64>> {
        words
            .iter()
            .map(|w| {
                let key = index_key(&json!(w)).unwrap();
                (0..4).flat_map(|s| {
                    entries_on_shard(&env.shard_dir(s), "tags", &path, key)
                        .into_iter()
                        .map(move |id| s as u64 * 100 + id)
                }).collect()
            })
            .collect()
    };

    env.coordinator.index("tags", &path).unwrap();
    let first = placement(&env);

    env.coordinator.unindex("tags", &path).unwrap();
    env.coordinator.reload_schema().unwrap();
    env.coordinator.index("tags", &path).unwrap();
    assert_eq!(placement(&env), first);
}

#[test]
fn index_on_missing_collection_fails_at_first_shard() {
    let env = init_test_env(2);
    let err = env.coordinator.index("ghost", &IndexPath::new(["a"])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.shard, Some(0));
}

#[test]
fn indexing_twice_is_rejected() {
    let env = init_test_env(2);
    env.create_visible("c");
    env.coordinator.index("c", &IndexPath::new(["a"])).unwrap();
    let err = env.coordinator.index("c", &IndexPath::new(["a"])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyExists);
}

#[test]
fn index_listing_is_sorted() {
    let env = init_test_env(2);
    env.create_visible("c");
    env.coordinator.index("c", &IndexPath::new(["zip"])).unwrap();
    env.coordinator.index("c", &IndexPath::new(["addr", "city"])).unwrap();

    assert_eq!(env.coordinator.all_indexes_joint_paths("c").unwrap(), vec!["addr!city", "zip"]);
    assert_eq!(
        env.coordinator.all_indexes("c").unwrap(),
        vec![IndexPath::new(["addr", "city"]), IndexPath::new(["zip"])]
    );
    assert_eq!(env.coordinator.all_indexes("nope").unwrap_err().kind, ErrorKind::NotFound);
}

#[test]
fn unindex_skips_shard_missing_the_collection() {
    let env = init_test_env(3);
    env.create_visible("c");
    let path = IndexPath::new(["a"]);
    env.coordinator.index("c", &path).unwrap();

    fs::remove_dir_all(env.shard_dir(1).join("c")).unwrap();
    env.coordinator.unindex("c", &path).unwrap();

    for shard in [0, 2] {
        let store = ShardStore::open(env.shard_dir(shard)).unwrap();
        assert!(!store.use_collection("c").unwrap().is_indexed(&path));
    }

    // no reload happens on unindex
    assert_eq!(env.coordinator.all_indexes("c").unwrap(), vec![path.clone()]);
    env.coordinator.reload_schema().unwrap();
    assert!(env.coordinator.all_indexes("c").unwrap().is_empty());
}

#[test]
fn path_flattening_to_an_indexed_path_is_rejected() {
    let env = init_test_env(1);
    env.create_visible("c");
    env.insert("c", 1, json!({"a!b": "x"}));
    let flat = IndexPath::new(["a!b"]);
    env.coordinator.index("c", &flat).unwrap();
    assert_eq!(env.coordinator.lookup("c", &flat, &json!("x")).unwrap(), vec![DocId(1)]);

    let err = env.coordinator.index("c", &IndexPath::new(["a", "b"])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyExists);
    assert_eq!(err.shard, Some(0));

    assert_eq!(env.coordinator.all_indexes_joint_paths("c").unwrap(), vec!["a!b".to_string()]);
    assert_eq!(env.coordinator.lookup("c", &flat, &json!("x")).unwrap(), vec![DocId(1)]);
}
