use futures::future::join_all;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{ObjectMeta, WatchEvent};
use kube::runtime::controller::Action;
use kubecache::{Error, Notification, ResourceManager, ResourceManagerConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn config_map(name: &str, generation: i64) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            generation: Some(generation),
            ..Default::default()
        },
        ..Default::default()
    }
}

type Calls = Arc<Mutex<Vec<(Option<String>, HashMap<String, ConfigMap>)>>>;

#[tokio::test]
async fn test_steady_mode_scenario() -> anyhow::Result<()> {
    init_tracing();
    let cache: ResourceManager<ConfigMap> = ResourceManager::new(false);
    let calls: Calls = Arc::default();

    let sink = calls.clone();
    let directive = cache
        .reconciled(config_map("zero", 0), move |identity, snapshot| async move {
            sink.lock().unwrap().push((identity, snapshot));
            Ok::<_, anyhow::Error>(Action::requeue(Duration::from_secs(300)))
        })
        .await?;

    assert!(directive.is_some());
    assert!(cache.contains("zero").await);

    let sink = calls.clone();
    let directive = cache
        .reconciled(config_map("zero", 0), move |identity, snapshot| async move {
            sink.lock().unwrap().push((identity, snapshot));
            Ok::<_, anyhow::Error>(Action::await_change())
        })
        .await?;

    assert!(directive.is_none());
    assert_eq!(calls.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_wait_for_all_scenario() -> anyhow::Result<()> {
    init_tracing();
    let cache = ResourceManager::with_config(ResourceManagerConfig::default().with_wait_for_all(true));
    let calls: Calls = Arc::default();

    for resource in [config_map("zero", 0), config_map("one", 0)] {
        let sink = calls.clone();
        let directive = cache
            .reconciled(resource, move |identity, snapshot| async move {
                sink.lock().unwrap().push((identity, snapshot));
                Ok::<_, anyhow::Error>(())
            })
            .await?;
        assert!(directive.is_none());
    }
    assert!(calls.lock().unwrap().is_empty());

    let sink = calls.clone();
    cache
        .reconciled(config_map("zero", 0), move |identity, snapshot| async move {
            sink.lock().unwrap().push((identity, snapshot));
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    let sink = calls.clone();
    cache
        .reconciled(config_map("zero", 100), move |identity, snapshot| async move {
            sink.lock().unwrap().push((identity, snapshot));
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, None);
    assert_eq!(calls[0].1.len(), 2);
    assert_eq!(calls[1].0.as_deref(), Some("zero"));
    assert_eq!(calls[1].1["zero"].metadata.generation, Some(100));
    Ok(())
}

#[tokio::test]
async fn test_readiness_never_fires_twice() -> anyhow::Result<()> {
    init_tracing();
    let cache = ResourceManager::new(true);
    let ready_signals = Arc::new(AtomicUsize::new(0));

    for round in 0..3 {
        for name in ["a", "b", "c"] {
            let signals = ready_signals.clone();
            cache
                .reconciled(config_map(name, round), move |identity, _| async move {
                    if identity.is_none() {
                        signals.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok::<_, anyhow::Error>(())
                })
                .await?;
        }
        for name in ["a", "b", "c"] {
            let signals = ready_signals.clone();
            cache
                .reconciled(config_map(name, round), move |identity, _| async move {
                    if identity.is_none() {
                        signals.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok::<_, anyhow::Error>(())
                })
                .await?;
        }
    }

    assert_eq!(ready_signals.load(Ordering::SeqCst), 1);
    assert!(cache.is_ready().await);
    Ok(())
}

#[tokio::test]
async fn test_callback_error_keeps_cache_consistent() {
    init_tracing();
    let cache = ResourceManager::new(false);

    let result = cache
        .reconciled(config_map("zero", 1), |_, _| async {
            Err::<(), Error>(Error::Custom("apply failed".to_string()))
        })
        .await;

    assert!(matches!(result, Err(Error::Custom(ref msg)) if msg == "apply failed"));
    assert_eq!(
        cache
            .get_resource("zero")
            .await
            .and_then(|cm| cm.metadata.generation),
        Some(1)
    );

    // A retry of the same generation is now a duplicate
    let retried = cache
        .reconciled(config_map("zero", 1), |_, _| async { Ok::<_, Error>(()) })
        .await;
    assert!(matches!(retried, Ok(None)));
}

#[tokio::test]
async fn test_concurrent_notifications_for_many_resources() {
    init_tracing();
    let cache = Arc::new(ResourceManager::new(false));
    let notified = Arc::new(AtomicUsize::new(0));

    let tasks = (0..50).flat_map(|i| {
        let name = format!("cm-{}", i % 10);
        (0..2).map(move |_| (name.clone(), i))
    });

    let pending = tasks.map(|(name, i)| {
        let cache = cache.clone();
        let notified = notified.clone();
        async move {
            cache
                .reconciled(config_map(&name, i / 10), move |_, snapshot| async move {
                    assert!(!snapshot.is_empty());
                    notified.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(())
                })
                .await
        }
    });

    for result in join_all(pending).await {
        assert!(result.is_ok());
    }

    let stats = cache.stats().await;
    assert_eq!(stats.total_entries, 10);
    assert_eq!(stats.notified + stats.absorbed, 100);
    assert_eq!(stats.notified as usize, notified.load(Ordering::SeqCst));
    assert!(stats.notified >= 10);
}

#[tokio::test]
async fn test_watch_events_drive_the_cache() -> kubecache::Result<()> {
    init_tracing();
    let cache = ResourceManager::new(false);
    let events = vec![
        WatchEvent::Added(config_map("zero", 1)),
        WatchEvent::Modified(config_map("zero", 1)),
        WatchEvent::Modified(config_map("zero", 2)),
        WatchEvent::Deleted(config_map("zero", 2)),
        WatchEvent::Deleted(config_map("zero", 2)),
    ];

    let mut directives = Vec::new();
    for event in events {
        if let Some(notification) = Notification::from_watch_event(event)? {
            let directive = cache
                .dispatch(notification, |identity, _| async move {
                    Ok::<_, kubecache::Error>(identity)
                })
                .await?;
            directives.push(directive);
        }
    }

    assert_eq!(
        directives,
        vec![
            Some(Some("zero".to_string())),
            None,
            Some(Some("zero".to_string())),
            Some(Some("zero".to_string())),
            None,
        ]
    );
    assert!(cache.is_empty().await);
    Ok(())
}
