//! Concurrent writers across channels

use std::thread;

use linkstore::LinkLookup;

use crate::common::*;

#[test]
fn parallel_adds_keep_indexes_consistent() {
    let (_, _, store) = memory_store(&ClientConfig::default());
    let threads = 8;
    let per_thread = 20;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                let ctx = Context::background();
                // Two threads share each channel, each with its own hashes
                let channel = 1 + (t / 2) as i64;
                for i in 0..per_thread {
                    store
                        .add_link(&ctx, &sample(channel, t * 1000 + i))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let ctx = Context::background();
    for channel in 1..=(threads / 2) as i64 {
        let links = store.get_channel_invite_links(&ctx, channel).unwrap();
        assert_eq!(links.len(), (per_thread * 2) as usize);
        for l in &links {
            let record = store.get_link(&ctx, l).unwrap();
            assert_eq!(record.meta.channel_id, channel);
        }
        assert!(matches!(
            store.get_last_link_channel_checked(&ctx, channel).unwrap(),
            LinkLookup::Found(_)
        ));
    }
}

#[test]
fn parallel_batches_and_removals() {
    let (_, _, store) = memory_store(&ClientConfig::default());
    let ctx = Context::background();
    let channel = 42;

    let batch: Vec<_> = (0..50).map(|i| sample(channel, i)).collect();
    store.add_links(&ctx, &batch).unwrap();

    let removers: Vec<_> = (0..5u32)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                let ctx = Context::background();
                for i in (t * 10)..(t * 10 + 5) {
                    store.remove_link(&ctx, channel, &link(channel, i)).unwrap();
                }
            })
        })
        .collect();
    for h in removers {
        h.join().unwrap();
    }

    let remaining = store.get_channel_invite_links(&ctx, channel).unwrap();
    assert_eq!(remaining.len(), 25);
    for l in &remaining {
        assert!(store.get_link(&ctx, l).is_ok());
    }
}
