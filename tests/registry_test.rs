use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use sigresolve::errors::{ResolverError, Result};
use sigresolve::resolution::{Dispatcher, Position, Registration, ResolverHandle, ResolverRegistry};
use sigresolve::strategy::{
    builtin, FragmentResolver, PropertyBag, ResourceResolverStrategy, StrategyCatalog,
    XPointerResolver,
};
use sigresolve::types::{Reference, Resource};

/// Strategy that claims everything and identifies itself by name.
struct Named {
    name: &'static str,
    properties: PropertyBag,
}

impl Named {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            properties: PropertyBag::new(),
        }
    }
}

impl ResourceResolverStrategy for Named {
    fn name(&self) -> &str {
        self.name
    }

    fn can_resolve(&self, _reference: &Reference) -> bool {
        true
    }

    fn resolve(&self, _reference: &Reference) -> Result<Resource> {
        Ok(Resource::octets(self.name.as_bytes().to_vec(), None))
    }

    fn is_thread_safe(&self) -> bool {
        true
    }

    fn fresh_instance(&self) -> Result<Box<dyn ResourceResolverStrategy>> {
        Ok(Box::new(Named::new(self.name)))
    }

    fn properties(&self) -> &PropertyBag {
        &self.properties
    }
}

fn new_custom() -> Result<Box<dyn ResourceResolverStrategy>> {
    Ok(Box::new(Named::new("custom")))
}

fn new_broken() -> Result<Box<dyn ResourceResolverStrategy>> {
    Err(ResolverError::Instantiation {
        strategy: "broken".to_string(),
        message: "native library not available".to_string(),
    })
}

#[test]
fn test_new_registry_is_empty() {
    let registry = ResolverRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_register_defaults_fixed_order() {
    let registry = ResolverRegistry::new();
    let outcomes = registry.register_defaults();
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(Registration::is_registered));
    assert_eq!(
        registry.strategy_names(),
        vec!["fragment", "local-filesystem", "xpointer", "direct-http"]
    );
}

#[test]
fn test_append_and_prepend_order() {
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(Named::new("b")));
    registry.append(ResolverHandle::new(Named::new("c")));
    registry.prepend(ResolverHandle::new(Named::new("a")));
    registry.append(ResolverHandle::new(Named::new("d")));
    assert_eq!(registry.strategy_names(), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_prepend_takes_priority_in_dispatch() {
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(Named::new("old")));
    registry.prepend(ResolverHandle::new(Named::new("new")));

    let name = Dispatcher::new(&registry)
        .select(&Reference::new("anything", ""), &[])
        .unwrap();
    assert_eq!(name, "new");
}

#[test]
fn test_append_is_probed_last() {
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(Named::new("old")));
    registry.append(ResolverHandle::new(Named::new("new")));

    let name = Dispatcher::new(&registry)
        .select(&Reference::new("anything", ""), &[])
        .unwrap();
    assert_eq!(name, "old");
}

#[test]
fn test_register_unknown_name_is_skipped() {
    let registry = ResolverRegistry::new();
    registry.register_defaults();
    let before = registry.strategy_names();

    let outcome = registry.register("does.not.Exist");
    match outcome {
        Registration::Skipped { identifier, reason } => {
            assert_eq!(identifier, "does.not.Exist");
            assert!(matches!(reason, ResolverError::Instantiation { .. }));
        }
        other => panic!("expected Skipped, got {other:?}"),
    }
    assert_eq!(registry.strategy_names(), before);

    let outcome = registry.register_at_start("does.not.Exist");
    assert!(outcome.is_skipped());
    assert_eq!(registry.strategy_names(), before);
}

#[test]
fn test_register_by_name_positions() {
    let registry = ResolverRegistry::new();
    let first = registry.register(builtin::FRAGMENT);
    let second = registry.register_at_start(builtin::XPOINTER);

    assert!(matches!(
        first,
        Registration::Registered {
            position: Position::End,
            ..
        }
    ));
    match second {
        Registration::Registered { strategy, position } => {
            assert_eq!(strategy, "xpointer");
            assert_eq!(position, Position::Start);
        }
        other => panic!("expected Registered, got {other:?}"),
    }
    assert_eq!(registry.strategy_names(), vec!["xpointer", "fragment"]);
}

#[test]
fn test_custom_catalog_entries() {
    let mut catalog = StrategyCatalog::builtin();
    catalog.insert("custom", new_custom);
    catalog.insert("broken", new_broken);
    assert!(catalog.contains("custom"));

    let registry = ResolverRegistry::with_catalog(catalog);
    assert!(registry.register("custom").is_registered());

    let outcome = registry.register("broken");
    match outcome {
        Registration::Skipped { identifier, reason } => {
            assert_eq!(identifier, "broken");
            assert!(reason.to_string().contains("native library not available"));
        }
        other => panic!("expected Skipped, got {other:?}"),
    }
    assert_eq!(registry.strategy_names(), vec!["custom"]);
}

#[test]
fn test_register_defaults_ignores_custom_catalog() {
    let mut catalog = StrategyCatalog::empty();
    catalog.insert(builtin::FRAGMENT, new_custom);
    let registry = ResolverRegistry::with_catalog(catalog);
    registry.register_defaults();
    assert_eq!(registry.strategy_names()[0], "fragment");
}

#[test]
fn test_register_by_name_with_configures_before_insert() {
    let registry = ResolverRegistry::new();
    let outcome = registry.register_by_name_with(builtin::DIRECT_HTTP, false, |handle| {
        handle.set_property("http.timeout.secs", "5");
    });
    assert!(outcome.is_registered());

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot[0].get_property("http.timeout.secs").as_deref(),
        Some("5")
    );
}

#[test]
fn test_configure_registered_handle() {
    let registry = ResolverRegistry::new();
    registry.append(ResolverHandle::new(FragmentResolver::new()));
    registry.append(ResolverHandle::new(XPointerResolver::new()));

    assert!(registry.configure("xpointer", |handle| handle.set_property("k", "v")));
    assert!(!registry.configure("missing", |_| {}));

    let snapshot = registry.snapshot();
    assert_eq!(snapshot[0].get_property("k"), None);
    assert_eq!(snapshot[1].get_property("k").as_deref(), Some("v"));
}

#[test]
fn test_configure_callback_may_use_registry() {
    let registry = Arc::new(ResolverRegistry::new());
    registry.register_defaults();

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(&registry);
    thread::spawn(move || {
        let mut seen = 0;
        let found = worker.configure("fragment", |handle| {
            seen = worker.len();
            handle.set_property("k", "v");
            worker.register("xpointer");
        });
        let _ = tx.send((found, seen));
    });

    let (found, seen) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("configure callback calling the registry should not block");
    assert!(found);
    assert_eq!(seen, 4);
    assert_eq!(registry.len(), 5);
    assert!(registry.configure("fragment", |handle| {
        assert_eq!(handle.get_property("k").as_deref(), Some("v"));
    }));
}

#[test]
fn test_snapshot_preserves_order() {
    let registry = ResolverRegistry::new();
    registry.register_defaults();
    let snapshot = registry.snapshot();
    let names: Vec<&str> = snapshot.iter().map(|handle| handle.name()).collect();
    assert_eq!(
        names,
        vec!["fragment", "local-filesystem", "xpointer", "direct-http"]
    );
}

#[test]
fn test_global_registry_is_shared() {
    let a = ResolverRegistry::global();
    let b = ResolverRegistry::global();
    assert!(std::ptr::eq(a, b));
    assert!(std::ptr::eq(Dispatcher::global().registry(), a));
}
