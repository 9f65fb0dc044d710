//! Instance accessor tests against the in-memory backend

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use linkstore_client::{ClientConfig, Instance, KeyDbFactory, Ttl, LIST_FIRST, LIST_LAST};
use linkstore_core::{Context, ErrorKind, MsgPackSerializer};
use linkstore_storage::MemoryBackend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Nested {
    label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    int: i64,
    text: String,
    flag: bool,
    nested: Nested,
}

fn record(i: i64) -> Record {
    Record {
        int: i,
        text: format!("record {}", i),
        flag: i % 2 == 0,
        nested: Nested {
            label: format!("n{}", i),
        },
    }
}

fn instance() -> Instance {
    KeyDbFactory::in_memory(&ClientConfig::default())
        .unwrap()
        .new_instance("test", Ttl::Persistent)
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn set_then_get_struct() {
    let ctx = Context::background();
    let inst = instance();
    inst.set(&ctx, "rec", &record(1)).unwrap();
    assert_eq!(inst.get::<Record>(&ctx, "rec").unwrap(), record(1));
}

#[test]
fn set_overwrites() {
    let ctx = Context::background();
    let inst = instance();
    inst.set(&ctx, "k", "first").unwrap();
    inst.set(&ctx, "k", "second").unwrap();
    assert_eq!(inst.get::<String>(&ctx, "k").unwrap(), "second");
}

#[test]
fn get_missing_is_not_found() {
    let ctx = Context::background();
    let err = instance().get::<String>(&ctx, "missing").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "no data");
}

#[test]
fn get_with_wrong_type_is_serialization_error() {
    let ctx = Context::background();
    let inst = instance();
    inst.set(&ctx, "k", "text").unwrap();
    let err = inst.get::<Record>(&ctx, "k").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert!(err.to_string().starts_with("unmarshal"));
}

#[test]
fn is_exist_tracks_lifecycle() {
    let ctx = Context::background();
    let inst = instance();
    assert!(!inst.is_exist(&ctx, "k").unwrap());
    inst.set(&ctx, "k", &1).unwrap();
    assert!(inst.is_exist(&ctx, "k").unwrap());
    inst.delete(&ctx, &["k"]).unwrap();
    assert!(!inst.is_exist(&ctx, "k").unwrap());
}

#[test]
fn delete_is_idempotent() {
    let ctx = Context::background();
    let inst = instance();
    inst.set(&ctx, "a", &1).unwrap();
    inst.delete(&ctx, &["a", "never-set"]).unwrap();
    inst.delete(&ctx, &["a"]).unwrap();
    inst.delete(&ctx, &[]).unwrap();
}

#[test]
fn expiring_instance_hides_values() {
    let ctx = Context::background();
    let factory = KeyDbFactory::in_memory(&ClientConfig::default()).unwrap();
    let short = factory.new_instance("short", Ttl::Expire(Duration::from_millis(20)));
    short.set(&ctx, "k", "v").unwrap();
    assert!(short.is_exist(&ctx, "k").unwrap());

    std::thread::sleep(Duration::from_millis(40));
    assert!(short.get::<String>(&ctx, "k").unwrap_err().is_not_found());
}

#[test]
fn cancelled_context_fails_fast() {
    let ctx = Context::background().with_cancel();
    ctx.cancel();
    let err = instance().set(&ctx, "k", "v").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn expired_deadline_fails() {
    let ctx = Context::background().with_timeout(Duration::ZERO);
    let err = instance().get::<String>(&ctx, "k").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
}

#[test]
fn backend_failures_carry_command_context() {
    let ctx = Context::background();
    let backend = Arc::new(MemoryBackend::new());
    let factory = KeyDbFactory::new(&ClientConfig::default(), backend.clone()).unwrap();
    let inst = factory.new_instance("test", Ttl::Persistent);

    inst.set(&ctx, "scalar", "v").unwrap();
    let err = inst.rpush(&ctx, "scalar", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().starts_with("keydb.RPush"));
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn get_list_of_structs_keeps_order() {
    let ctx = Context::background();
    let inst = instance();
    for i in 0..5 {
        inst.rpush(&ctx, "recs", &record(i)).unwrap();
    }
    let all: Vec<Record> = inst.get_list(&ctx, "recs").unwrap();
    assert_eq!(all, (0..5).map(record).collect::<Vec<_>>());
}

#[test]
fn get_list_missing_is_not_found() {
    let ctx = Context::background();
    assert!(instance()
        .get_list::<String>(&ctx, "none")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn lpush_prepends() {
    let ctx = Context::background();
    let inst = instance();
    inst.rpush(&ctx, "l", "b").unwrap();
    inst.lpush(&ctx, "l", "a").unwrap();
    assert_eq!(inst.get_list::<String>(&ctx, "l").unwrap(), vec!["a", "b"]);
}

#[test]
fn pops_remove_from_ends() {
    let ctx = Context::background();
    let inst = instance();
    for v in ["a", "b", "c"] {
        inst.rpush(&ctx, "l", v).unwrap();
    }
    assert_eq!(inst.rpop::<String>(&ctx, "l").unwrap(), "c");
    assert_eq!(inst.lpop::<String>(&ctx, "l").unwrap(), "a");
    assert_eq!(inst.lpop::<String>(&ctx, "l").unwrap(), "b");
    assert!(inst.rpop::<String>(&ctx, "l").unwrap_err().is_not_found());
}

#[test]
fn element_by_position() {
    let ctx = Context::background();
    let inst = instance();
    for i in 0..3 {
        inst.rpush(&ctx, "l", &record(i)).unwrap();
    }
    assert_eq!(
        inst.get_element_by_position::<Record>(&ctx, "l", LIST_FIRST).unwrap(),
        record(0)
    );
    assert_eq!(
        inst.get_element_by_position::<Record>(&ctx, "l", LIST_LAST).unwrap(),
        record(2)
    );
    assert_eq!(
        inst.get_element_by_position::<Record>(&ctx, "l", 1).unwrap(),
        record(1)
    );
    assert!(inst
        .get_element_by_position::<Record>(&ctx, "l", 3)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn remove_from_list_removes_first_match_only() {
    let ctx = Context::background();
    let inst = instance();
    for v in ["x", "y", "x"] {
        inst.rpush(&ctx, "l", v).unwrap();
    }
    inst.remove_from_list(&ctx, "l", "x").unwrap();
    assert_eq!(inst.get_list::<String>(&ctx, "l").unwrap(), vec!["y", "x"]);

    inst.remove_from_list(&ctx, "l", "absent").unwrap();
    assert_eq!(inst.get_list::<String>(&ctx, "l").unwrap(), vec!["y", "x"]);
}

#[test]
fn removing_last_element_empties_list() {
    let ctx = Context::background();
    let inst = instance();
    inst.rpush(&ctx, "l", "only").unwrap();
    inst.remove_from_list(&ctx, "l", "only").unwrap();
    assert!(!inst.is_exist(&ctx, "l").unwrap());
    assert!(inst.get_list::<String>(&ctx, "l").unwrap_err().is_not_found());
}

#[test]
fn msgpack_serializer_round_trips_lists() {
    let ctx = Context::background();
    let factory = KeyDbFactory::with_serializer(
        &ClientConfig::default(),
        Arc::new(MemoryBackend::new()),
        MsgPackSerializer,
    )
    .unwrap();
    let inst = factory.new_instance("packed", Ttl::Persistent);

    inst.set(&ctx, "one", &record(7)).unwrap();
    inst.rpush(&ctx, "l", &record(1)).unwrap();
    inst.rpush(&ctx, "l", &record(2)).unwrap();

    assert_eq!(inst.get::<Record>(&ctx, "one").unwrap(), record(7));
    assert_eq!(
        inst.get_list::<Record>(&ctx, "l").unwrap(),
        vec![record(1), record(2)]
    );
}

#[test]
fn json_values_are_inspectable_on_backend() {
    use linkstore_storage::{Backend, Command, Reply};

    let ctx = Context::background();
    let backend = Arc::new(MemoryBackend::new());
    let factory = KeyDbFactory::new(&ClientConfig::default(), backend.clone()).unwrap();
    factory
        .new_instance("test", Ttl::Persistent)
        .set(&ctx, "k", &Nested { label: "x".into() })
        .unwrap();

    let reply = backend.execute(&ctx, Command::Get { key: "k".into() }).unwrap();
    let Reply::Bytes(raw) = reply else {
        panic!("expected bytes, got {:?}", reply);
    };
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value["label"], "x");
}
