//! Store behaviour is independent of the value encoding

use std::sync::Arc;

use linkstore::{MsgPackSerializer, Ttl};

use crate::common::*;

#[test]
fn msgpack_backed_store() {
    init_tracing();
    let factory = KeyDbFactory::with_serializer(
        &ClientConfig::default(),
        Arc::new(MemoryBackend::new()),
        MsgPackSerializer,
    )
    .unwrap();
    let store = InviteLinkStore::new(&factory);
    let ctx = Context::background();

    for i in 0..3 {
        store.add_link(&ctx, &sample(7, i)).unwrap();
    }
    assert_eq!(
        store.get_channel_invite_links(&ctx, 7).unwrap(),
        (0..3).map(|i| link(7, i)).collect::<Vec<_>>()
    );
    assert_eq!(store.get_link(&ctx, &link(7, 1)).unwrap(), sample(7, 1));
    assert_eq!(store.get_last_link_channel(&ctx, 7).unwrap(), sample(7, 2));
}

#[test]
fn store_shares_backend_with_other_instances() {
    let (backend, factory, store) = memory_store(&ClientConfig::default());
    let ctx = Context::background();

    let scratch = factory.new_instance("scratch", Ttl::Persistent);
    scratch.set(&ctx, "unrelated", "value").unwrap();
    store.add_link(&ctx, &sample(3, 1)).unwrap();

    assert_eq!(backend.len(), 3);
}
