//! Store lifecycle driven by a config file

use linkstore::{LinkLookup, RetryPolicy};
use tempfile::TempDir;

use crate::common::*;

#[test]
fn lifecycle_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(linkstore_client::CONFIG_FILE_NAME);
    std::fs::write(&path, ClientConfig::default_toml()).unwrap();
    let config = ClientConfig::from_file(&path).unwrap();

    let (_, _, store) = memory_store(&config);
    let ctx = Context::background();
    let channel = -100_500;

    store.add_link(&ctx, &sample(channel, 1)).unwrap();
    store.add_link(&ctx, &sample(channel, 2)).unwrap();

    store
        .update_link(
            &ctx,
            &ChannelInviteLinkUpdateModel::new(link(channel, 2), channel).with_user_limit(10),
        )
        .unwrap();
    let last = store.get_last_link_channel(&ctx, channel).unwrap();
    assert_eq!(last.link, link(channel, 2));
    assert_eq!(last.meta.user_limit, 10);

    store.remove_link(&ctx, channel, &link(channel, 2)).unwrap();
    match store.get_last_link_channel_checked(&ctx, channel).unwrap() {
        LinkLookup::Found(found) => assert_eq!(found, sample(channel, 1)),
        other => panic!("unexpected lookup {:?}", other),
    }

    store.remove_link(&ctx, channel, &link(channel, 1)).unwrap();
    assert!(matches!(
        store.get_channel_invite_links(&ctx, channel),
        Err(InviteError::LinkNotFound)
    ));
}

#[test]
fn factory_retrier_follows_config() {
    let config = ClientConfig::from_toml_str("[retry]\nmax_attempts = 2\nstart_delay_ms = 1\n").unwrap();
    let (_, factory, store) = memory_store(&config);
    let ctx = Context::background();

    assert_eq!(
        factory.retrier().policy(),
        &RetryPolicy::default().with_max_attempts(2).with_start_delay_ms(1)
    );

    let mut calls = 0;
    let err = factory
        .retrier()
        .exclude::<InviteError, _>(InviteError::is_permanent)
        .wrap(&ctx, "get_link", || {
            calls += 1;
            store.get_link(&ctx, &link(1, 1))
        })
        .unwrap_err();
    assert!(matches!(err, InviteError::LinkNotFound));
    assert_eq!(calls, 1);
}

#[test]
fn closed_factory_surfaces_store_errors() {
    let (_, factory, store) = memory_store(&ClientConfig::default());
    let ctx = Context::background();
    factory.close().unwrap();

    let err = store.add_link(&ctx, &sample(1, 1)).unwrap_err();
    assert!(matches!(err, InviteError::Store(_)));
    assert!(!err.is_permanent());
}
