use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use client::{
    AddressingStrategy, ConfigurationError, LocatorConfig, LocatorOptions, ServiceKind, ServiceLocator,
    ServiceUrls, SubdomainAddress,
};
use common::diagnostics::{DiagnosticsSink, LocatorEvent};
use services::{CredentialStore, MemoryCredentialStore, SessionData, Transport, TransportConfig};

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<LocatorEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<LocatorEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&LocatorEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn record(&self, event: &LocatorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Holds auth initialization open until released.
struct GatedAuthSink {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl DiagnosticsSink for GatedAuthSink {
    fn record(&self, event: &LocatorEvent) {
        if matches!(event, LocatorEvent::ServiceInitialized { service: ServiceKind::Auth, .. }) {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(5));
        }
    }
}

fn local_urls() -> ServiceUrls {
    ServiceUrls::new(
        "http://localhost:1337/v1/auth",
        "http://localhost:1337/v1/storage",
        "http://localhost:1337/v1/functions",
        "http://localhost:1337/v1/graphql",
    )
}

fn subdomain_locator(sink: Arc<RecordingSink>) -> ServiceLocator {
    ServiceLocator::create(LocatorConfig {
        subdomain: Some(SubdomainAddress::new("myapp", "eu-west-1")),
        service_urls: None,
        options: LocatorOptions::default().with_diagnostics(sink),
    })
    .expect("valid addressing")
}

#[test]
fn both_or_neither_addressing_fails() {
    let both = ServiceLocator::create(LocatorConfig {
        subdomain: Some(SubdomainAddress::new("myapp", "eu-west-1")),
        service_urls: Some(local_urls()),
        options: LocatorOptions::default(),
    });
    assert_eq!(both.err(), Some(ConfigurationError::AmbiguousAddressing));

    let neither = ServiceLocator::create(LocatorConfig::default());
    assert_eq!(neither.err(), Some(ConfigurationError::MissingAddressing));
}

#[test]
fn construction_allocates_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let locator = subdomain_locator(sink.clone());

    for kind in [ServiceKind::Auth, ServiceKind::Storage, ServiceKind::Functions] {
        assert!(!locator.is_initialized(kind));
    }
    assert!(!locator.owns_transport());
    assert!(locator.session().current().is_none());
    assert_eq!(sink.events(), vec![LocatorEvent::Created { strategy: "subdomain" }]);
}

#[test]
fn accessors_memoize_independently() -> anyhow::Result<()> {
    let sink = Arc::new(RecordingSink::default());
    let locator = subdomain_locator(sink.clone());

    let storage = locator.storage()?;
    assert!(locator.is_initialized(ServiceKind::Storage));
    assert!(!locator.is_initialized(ServiceKind::Auth));
    assert!(!locator.is_initialized(ServiceKind::Functions));
    assert!(Arc::ptr_eq(&storage, &locator.storage()?));

    let auth = locator.auth()?;
    let functions = locator.functions()?;
    assert!(Arc::ptr_eq(&auth, &locator.auth()?));
    assert!(Arc::ptr_eq(&functions, &locator.functions()?));

    assert_eq!(sink.count(|e| matches!(e, LocatorEvent::TransportCreated)), 1);
    assert!(Arc::ptr_eq(auth.transport(), storage.transport()));
    assert!(Arc::ptr_eq(storage.transport(), functions.transport()));
    Ok(())
}

#[test]
fn sub_clients_share_one_session() -> anyhow::Result<()> {
    let locator = ServiceLocator::new(AddressingStrategy::from_service_urls(local_urls()), LocatorOptions::default());
    let auth = locator.auth()?;
    let storage = locator.storage()?;
    let functions = locator.functions()?;

    assert!(Arc::ptr_eq(auth.session(), locator.session()));
    assert!(storage.session().is_view_of(locator.session()));
    assert!(functions.session().is_view_of(locator.session()));

    auth.session().set(SessionData::new("fresh"))?;
    assert_eq!(storage.session().access_token().as_deref(), Some("fresh"));
    assert_eq!(functions.session().bearer().as_deref(), Some("Bearer fresh"));
    Ok(())
}

#[test]
fn subdomain_endpoints_differ_but_share_components() -> anyhow::Result<()> {
    let locator = subdomain_locator(Arc::new(RecordingSink::default()));
    let endpoints = vec![
        locator.graphql_endpoint_url(),
        locator.auth()?.endpoint().to_string(),
        locator.storage()?.endpoint().to_string(),
        locator.functions()?.endpoint().to_string(),
    ];
    for (i, a) in endpoints.iter().enumerate() {
        assert!(a.contains("myapp") && a.contains("eu-west-1"), "{a}");
        for b in endpoints.iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
    Ok(())
}

#[test]
fn explicit_urls_used_verbatim() -> anyhow::Result<()> {
    let urls = local_urls();
    let locator = ServiceLocator::new(AddressingStrategy::from_service_urls(urls.clone()), LocatorOptions::default());
    assert_eq!(locator.graphql_endpoint_url(), urls.graphql_url);
    assert_eq!(locator.auth()?.endpoint(), urls.auth_url);
    assert_eq!(locator.storage()?.endpoint(), urls.storage_url);
    assert_eq!(locator.functions()?.endpoint(), urls.functions_url);
    Ok(())
}

#[test]
fn close_before_use_tears_down_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let locator = subdomain_locator(sink.clone());
    locator.close();

    assert!(locator.is_closed());
    assert_eq!(
        sink.events(),
        vec![LocatorEvent::Created { strategy: "subdomain" }, LocatorEvent::Closed]
    );
}

#[test]
fn close_twice_equals_once() -> anyhow::Result<()> {
    let sink = Arc::new(RecordingSink::default());
    let locator = subdomain_locator(sink.clone());
    let auth = locator.auth()?;
    let storage = locator.storage()?;
    let _functions = locator.functions()?;

    locator.close();
    let after_first = sink.events();
    locator.close();
    assert_eq!(sink.events(), after_first);

    assert!(auth.is_closed());
    assert!(storage.is_closed());
    assert!(auth.transport().is_closed());

    let teardown: Vec<_> = after_first
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                LocatorEvent::ServiceClosed { .. } | LocatorEvent::TransportClosed | LocatorEvent::Closed
            )
        })
        .collect();
    assert_eq!(
        teardown,
        vec![
            LocatorEvent::ServiceClosed { service: ServiceKind::Auth },
            LocatorEvent::ServiceClosed { service: ServiceKind::Storage },
            LocatorEvent::TransportClosed,
            LocatorEvent::Closed,
        ]
    );
    Ok(())
}

#[test]
fn close_keeps_session_and_store() -> anyhow::Result<()> {
    let store = Arc::new(MemoryCredentialStore::default());
    let locator = ServiceLocator::new(
        AddressingStrategy::from_service_urls(local_urls()),
        LocatorOptions::default().with_credential_store(store.clone()),
    );
    let auth = locator.auth()?;
    auth.session().set(SessionData::new("persisted").with_refresh_token("r"))?;

    locator.close();

    assert_eq!(locator.session().access_token().as_deref(), Some("persisted"));
    assert_eq!(store.load()?.map(|d| d.access_token), Some("persisted".to_string()));

    let resumed = ServiceLocator::new(
        AddressingStrategy::from_service_urls(local_urls()),
        LocatorOptions::default().with_credential_store(store.clone()),
    );
    assert!(resumed.auth()?.restore_session()?);
    assert_eq!(resumed.session().refresh_token().as_deref(), Some("r"));
    Ok(())
}

#[test]
fn caller_supplied_transport_is_never_closed() -> anyhow::Result<()> {
    let sink = Arc::new(RecordingSink::default());
    let transport = Arc::new(Transport::new(&TransportConfig::default())?);
    let locator = ServiceLocator::new(
        AddressingStrategy::from_service_urls(local_urls()),
        LocatorOptions::default()
            .with_transport(transport.clone())
            .with_diagnostics(sink.clone()),
    );

    let functions = locator.functions()?;
    assert!(Arc::ptr_eq(functions.transport(), &transport));
    assert!(!locator.owns_transport());

    locator.close();
    assert!(!transport.is_closed());
    assert_eq!(sink.count(|e| matches!(e, LocatorEvent::TransportRetained)), 1);
    assert_eq!(sink.count(|e| matches!(e, LocatorEvent::TransportClosed)), 0);
    Ok(())
}

#[test]
fn concurrent_first_auth_access_builds_one_client() {
    let sink = Arc::new(RecordingSink::default());
    let locator = subdomain_locator(sink.clone());
    let barrier = &Barrier::new(16);
    let locator = &locator;

    let ids: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = (0..16)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    locator.auth().expect("auth client")
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().expect("worker")).collect()
    });

    assert!(ids.iter().all(|a| Arc::ptr_eq(a, &ids[0])));
    assert!(ids.iter().all(|a| a.instance_id() == ids[0].instance_id()));
    assert_eq!(
        sink.count(|e| matches!(e, LocatorEvent::ServiceInitialized { service: ServiceKind::Auth, .. })),
        1
    );
    assert_eq!(sink.count(|e| matches!(e, LocatorEvent::TransportCreated)), 1);
}

#[test]
fn slow_auth_init_does_not_block_storage() -> anyhow::Result<()> {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let sink = Arc::new(GatedAuthSink { entered: Mutex::new(entered_tx), release: Mutex::new(release_rx) });
    let locator = ServiceLocator::new(
        AddressingStrategy::from_service_urls(local_urls()),
        LocatorOptions::default().with_diagnostics(sink),
    );
    let locator = &locator;

    thread::scope(|scope| -> anyhow::Result<()> {
        let auth_worker = scope.spawn(move || locator.auth().map(|a| a.instance_id()));
        entered_rx.recv_timeout(Duration::from_secs(5))?;
        assert!(!locator.is_initialized(ServiceKind::Auth));

        // auth is mid-initialization on the other thread
        let storage = locator.storage()?;
        assert!(locator.is_initialized(ServiceKind::Storage));
        assert!(!locator.is_initialized(ServiceKind::Auth));
        assert!(Arc::ptr_eq(&storage, &locator.storage()?));

        release_tx.send(())?;
        let auth_id = auth_worker.join().expect("auth worker")?;
        assert_eq!(locator.auth()?.instance_id(), auth_id);
        Ok(())
    })
}

#[tokio::test]
async fn close_stops_auth_refresh_loop() -> anyhow::Result<()> {
    let locator = ServiceLocator::new(
        AddressingStrategy::from_service_urls(local_urls()),
        LocatorOptions::default().with_refresh_interval(std::time::Duration::from_secs(1)),
    );
    let auth = locator.auth()?;
    assert_eq!(auth.refresh_interval(), std::time::Duration::from_secs(1));
    auth.start_auto_refresh()?;
    assert!(auth.is_auto_refreshing());

    locator.close();
    assert!(!auth.is_auto_refreshing());
    Ok(())
}
