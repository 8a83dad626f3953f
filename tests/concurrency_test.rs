use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use sigresolve::errors::Result;
use sigresolve::resolution::{Dispatcher, ResolverHandle, ResolverRegistry};
use sigresolve::strategy::{FragmentResolver, PropertyBag, ResourceResolverStrategy};
use sigresolve::types::{Reference, Resource};

const THREADS: usize = 8;
const ATTEMPTS_PER_THREAD: usize = 10;

/// Counters shared by every instance of [`Exclusive`].
#[derive(Default)]
struct Counters {
    instances: AtomicUsize,
    resolves: AtomicUsize,
    overlaps: AtomicUsize,
}

/// A strategy that must never run two resolutions on one instance. Each
/// instance tracks its own in-flight count and records an overlap in the
/// shared counters when it sees a second concurrent caller.
struct Exclusive {
    thread_safe: bool,
    in_flight: AtomicUsize,
    counters: Arc<Counters>,
    properties: PropertyBag,
}

impl Exclusive {
    fn new(thread_safe: bool, counters: Arc<Counters>) -> Self {
        Self {
            thread_safe,
            in_flight: AtomicUsize::new(0),
            counters,
            properties: PropertyBag::new(),
        }
    }
}

impl ResourceResolverStrategy for Exclusive {
    fn name(&self) -> &str {
        "exclusive"
    }

    fn can_resolve(&self, reference: &Reference) -> bool {
        reference.uri().is_some_and(|uri| uri.starts_with("ex:"))
    }

    fn resolve(&self, reference: &Reference) -> Result<Resource> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            self.counters.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(2));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.counters.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(Resource::octets(
            reference.uri_or_null().as_bytes().to_vec(),
            None,
        ))
    }

    fn is_thread_safe(&self) -> bool {
        self.thread_safe
    }

    fn fresh_instance(&self) -> Result<Box<dyn ResourceResolverStrategy>> {
        self.counters.instances.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Exclusive::new(
            self.thread_safe,
            Arc::clone(&self.counters),
        )))
    }

    fn properties(&self) -> &PropertyBag {
        &self.properties
    }
}

/// Runs `THREADS * ATTEMPTS_PER_THREAD` resolutions in parallel and checks
/// every one returned the content for its own reference.
fn hammer(dispatcher: Dispatcher<'_>, candidates: &[ResolverHandle]) {
    thread::scope(|scope| {
        for t in 0..THREADS {
            scope.spawn(move || {
                for i in 0..ATTEMPTS_PER_THREAD {
                    let uri = format!("ex:{t}-{i}");
                    let resource = dispatcher
                        .resolve(&Reference::new(uri.clone(), ""), candidates)
                        .expect("resolution should succeed");
                    assert_eq!(resource.bytes(), Some(uri.as_bytes()));
                }
            });
        }
    });
}

#[test]
fn test_unsafe_registry_strategy_never_overlaps() {
    let counters = Arc::new(Counters::default());
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(Exclusive::new(
        false,
        Arc::clone(&counters),
    )));

    hammer(Dispatcher::new(&registry), &[]);

    let total = THREADS * ATTEMPTS_PER_THREAD;
    assert_eq!(counters.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(counters.resolves.load(Ordering::SeqCst), total);
    assert_eq!(
        counters.instances.load(Ordering::SeqCst),
        total,
        "every attempt runs on its own instance"
    );
}

#[test]
fn test_unsafe_candidate_strategy_never_overlaps() {
    let counters = Arc::new(Counters::default());
    let registry = ResolverRegistry::new();
    let candidates = vec![ResolverHandle::new(Exclusive::new(
        false,
        Arc::clone(&counters),
    ))];

    hammer(Dispatcher::new(&registry), &candidates);

    let total = THREADS * ATTEMPTS_PER_THREAD;
    assert_eq!(counters.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(counters.instances.load(Ordering::SeqCst), total);
}

#[test]
fn test_thread_safe_strategy_is_shared() {
    let counters = Arc::new(Counters::default());
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(Exclusive::new(
        true,
        Arc::clone(&counters),
    )));

    hammer(Dispatcher::new(&registry), &[]);

    assert_eq!(
        counters.instances.load(Ordering::SeqCst),
        0,
        "thread-safe strategies are never cloned"
    );
    assert_eq!(
        counters.resolves.load(Ordering::SeqCst),
        THREADS * ATTEMPTS_PER_THREAD
    );
}

#[test]
fn test_registration_during_dispatch_keeps_order() {
    let counters = Arc::new(Counters::default());
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(Exclusive::new(
        true,
        Arc::clone(&counters),
    )));

    thread::scope(|scope| {
        scope.spawn(|| hammer(Dispatcher::new(&registry), &[]));
        scope.spawn(|| {
            for _ in 0..20 {
                registry.register("fragment");
            }
        });
    });

    let names = registry.strategy_names();
    assert_eq!(names.len(), 21);
    assert_eq!(names[0], "exclusive");
    assert!(names[1..].iter().all(|name| name == "fragment"));
}

#[test]
fn test_candidates_resolve_while_registry_is_locked() {
    let registry = Arc::new(ResolverRegistry::new());
    registry.register_defaults();

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = Arc::clone(&registry);
    let holder_thread = thread::spawn(move || {
        let snapshot = holder.snapshot();
        let _ = locked_tx.send(snapshot.len());
        let _ = release_rx.recv();
    });
    assert_eq!(
        locked_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        4
    );

    let (done_tx, done_rx) = mpsc::channel();
    let resolver = Arc::clone(&registry);
    thread::spawn(move || {
        let candidates = vec![ResolverHandle::new(FragmentResolver::new())];
        let outcome = Dispatcher::new(&resolver)
            .resolve(&Reference::new("#a", "doc.xml"), &candidates)
            .map(|resource| resource.node_selection().is_some());
        let _ = done_tx.send(outcome);
    });

    let outcome = done_rx.recv_timeout(Duration::from_secs(5));
    release_tx.send(()).unwrap();
    holder_thread.join().unwrap();

    let selected = outcome
        .expect("candidate resolution should not wait for the registry lock")
        .expect("candidate should resolve the fragment");
    assert!(selected);
}
