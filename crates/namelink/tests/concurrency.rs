//! Concurrent publishers racing on the same namespace.
//!
//! Every append must land exactly once, the chain must stay linear, and the
//! profile must end up pointing at the final head.

use std::collections::HashSet;
use std::sync::Arc;

use namelink::store::{MemoryStore, PointerStore, SqliteStore, Store};
use namelink::verify::MemoryChain;
use namelink::{Keypair, LinkDraft, Publisher, PublisherConfig, Reader};

const CHAIN: u64 = 100;
const WRITERS: usize = 8;
const PER_WRITER: usize = 4;

fn config() -> PublisherConfig {
    PublisherConfig {
        chain_id: CHAIN,
        max_append_attempts: 256,
        retry_backoff_ms: 1,
    }
}

async fn race<S: Store + 'static>(store: Arc<S>) -> anyhow::Result<()> {
    let keypair = Keypair::generate();
    let owner = keypair.address();

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let publisher = Publisher::new(keypair.clone(), store.clone(), config());
        handles.push(tokio::spawn(async move {
            for i in 0..PER_WRITER {
                let name = format!("w{}-n{}", writer, i);
                publisher
                    .publish("media", LinkDraft::new(name, format!("Qm{}x{}", writer, i)))
                    .await?;
            }
            Ok::<_, namelink::NamelinkError>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let reader = Reader::new(store, MemoryChain::new(CHAIN));
    let links = reader.links(&owner, "media").await?;
    assert_eq!(links.len(), WRITERS * PER_WRITER);

    let names: HashSet<_> = links.iter().map(|l| l.name().to_string()).collect();
    assert_eq!(names.len(), WRITERS * PER_WRITER);

    for writer in 0..WRITERS {
        for i in 0..PER_WRITER {
            let link = reader
                .resolve(&owner, "media", &format!("W{}-N{}", writer, i))
                .await?
                .expect("every appended name resolves");
            assert_eq!(link.body.payload_cid, format!("Qm{}x{}", writer, i));
        }
    }

    let index = reader.index(&owner, "media").await?;
    assert_eq!(index.entries.len(), WRITERS * PER_WRITER);

    let profile = reader.profile(&owner).await?.expect("profile exists");
    assert_eq!(profile.namespace_head("media"), Some(&index.head));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_memory() -> anyhow::Result<()> {
    race(Arc::new(MemoryStore::new())).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_sqlite() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    race(Arc::new(SqliteStore::open(dir.path().join("race.db"))?)).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_profile_edits_all_land() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let keypair = Keypair::generate();
    let owner = keypair.address();

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let publisher = Publisher::new(keypair.clone(), store.clone(), config());
        handles.push(tokio::spawn(async move {
            publisher
                .update_profile(|profile| {
                    profile
                        .extra
                        .insert(format!("field{}", writer), serde_json::json!(writer));
                })
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let versioned = store.load_profile(&owner).await?.expect("profile exists");
    assert_eq!(versioned.revision, WRITERS as u64);
    assert_eq!(versioned.value.extra.len(), WRITERS);
    Ok(())
}
