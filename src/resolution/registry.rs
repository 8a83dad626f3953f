use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{info, warn};

use super::handle::ResolverHandle;
use crate::errors::ResolverError;
use crate::strategy::{builtin, StrategyCatalog};

/// Where a registration placed its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Probed before every handle registered earlier.
    Start,
    /// Probed after every handle registered earlier.
    End,
}

/// Outcome of a registration by identifier.
///
/// Registration never fails the caller: an unknown or unconstructible
/// strategy is reported as `Skipped` and the registry stays unchanged.
#[derive(Debug)]
pub enum Registration {
    Registered {
        strategy: String,
        position: Position,
    },
    Skipped {
        identifier: String,
        reason: ResolverError,
    },
}

impl Registration {
    pub fn is_registered(&self) -> bool {
        matches!(self, Registration::Registered { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Registration::Skipped { .. })
    }
}

/// Ordered set of resolver handles. Index 0 is probed first.
///
/// Every read and every mutation goes through one exclusive lock, so a
/// dispatcher scanning the registry sees a consistent order for the whole
/// scan.
pub struct ResolverRegistry {
    handles: Mutex<Vec<Arc<ResolverHandle>>>,
    catalog: StrategyCatalog,
}

/// Locked view of the registry, in probe order.
///
/// Registration calls block while a snapshot is alive.
pub struct RegistrySnapshot<'a> {
    guard: MutexGuard<'a, Vec<Arc<ResolverHandle>>>,
}

impl Deref for RegistrySnapshot<'_> {
    type Target = [Arc<ResolverHandle>];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

static GLOBAL: OnceLock<ResolverRegistry> = OnceLock::new();

impl ResolverRegistry {
    /// Creates an empty registry that resolves identifiers against the
    /// built-in catalog.
    pub fn new() -> Self {
        Self::with_catalog(StrategyCatalog::builtin())
    }

    /// Creates an empty registry using `catalog` for name-based registration.
    pub fn with_catalog(catalog: StrategyCatalog) -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
            catalog,
        }
    }

    /// The process-wide registry. Empty until something registers into it.
    pub fn global() -> &'static ResolverRegistry {
        GLOBAL.get_or_init(ResolverRegistry::new)
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<ResolverHandle>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `handle` with the lowest priority.
    pub fn append(&self, handle: ResolverHandle) {
        let name = handle.name().to_string();
        self.lock().push(Arc::new(handle));
        info!(strategy = %name, "registered resolver at end");
    }

    /// Adds `handle` with the highest priority.
    pub fn prepend(&self, handle: ResolverHandle) {
        let name = handle.name().to_string();
        self.lock().insert(0, Arc::new(handle));
        info!(strategy = %name, "registered resolver at start");
    }

    /// Registers the strategy named `identifier` at the end.
    pub fn register(&self, identifier: &str) -> Registration {
        self.register_by_name(identifier, false)
    }

    /// Registers the strategy named `identifier` at the start.
    pub fn register_at_start(&self, identifier: &str) -> Registration {
        self.register_by_name(identifier, true)
    }

    /// Looks `identifier` up in the catalog, constructs one instance and
    /// registers it. Failures are logged and returned as
    /// [`Registration::Skipped`]; the registry is left unchanged.
    pub fn register_by_name(&self, identifier: &str, at_start: bool) -> Registration {
        self.register_by_name_with(identifier, at_start, |_| {})
    }

    /// Like [`register_by_name`](Self::register_by_name), running `configure`
    /// on the new handle before it becomes visible to dispatchers.
    pub fn register_by_name_with<F>(
        &self,
        identifier: &str,
        at_start: bool,
        configure: F,
    ) -> Registration
    where
        F: FnOnce(&ResolverHandle),
    {
        let strategy = match self.catalog.construct(identifier) {
            Ok(strategy) => strategy,
            Err(reason) => {
                warn!(%identifier, error = %reason, "error loading resolver, disabling it");
                return Registration::Skipped {
                    identifier: identifier.to_string(),
                    reason,
                };
            }
        };

        let handle = ResolverHandle::from_boxed(strategy);
        configure(&handle);
        let strategy = handle.name().to_string();
        let position = if at_start {
            self.prepend(handle);
            Position::Start
        } else {
            self.append(handle);
            Position::End
        };
        Registration::Registered { strategy, position }
    }

    /// Appends the built-in strategies in their fixed order: fragment,
    /// local-filesystem, xpointer, direct-http.
    ///
    /// The built-ins come from [`StrategyCatalog::builtin`] regardless of
    /// this registry's catalog. All successfully constructed handles are
    /// appended under a single lock acquisition.
    pub fn register_defaults(&self) -> Vec<Registration> {
        let builtins = StrategyCatalog::builtin();
        let mut outcomes = Vec::with_capacity(builtin::DEFAULT_ORDER.len());
        let mut constructed = Vec::with_capacity(builtin::DEFAULT_ORDER.len());

        for identifier in builtin::DEFAULT_ORDER {
            match builtins.construct(identifier) {
                Ok(strategy) => {
                    outcomes.push(Registration::Registered {
                        strategy: strategy.name().to_string(),
                        position: Position::End,
                    });
                    constructed.push(Arc::new(ResolverHandle::from_boxed(strategy)));
                }
                Err(reason) => {
                    warn!(%identifier, error = %reason, "error loading resolver, disabling it");
                    outcomes.push(Registration::Skipped {
                        identifier: identifier.to_string(),
                        reason,
                    });
                }
            }
        }

        let count = constructed.len();
        self.lock().extend(constructed);
        info!(count, "registered default resolvers");
        outcomes
    }

    /// Locks the registry and returns its handles in probe order.
    pub fn snapshot(&self) -> RegistrySnapshot<'_> {
        RegistrySnapshot { guard: self.lock() }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Strategy names in probe order.
    pub fn strategy_names(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|handle| handle.name().to_string())
            .collect()
    }

    /// Runs `f` on the first registered handle whose strategy is named
    /// `name`. Returns `false` when no such handle exists.
    ///
    /// The registry lock is released before `f` runs, so `f` may call back
    /// into the registry.
    pub fn configure<F>(&self, name: &str, f: F) -> bool
    where
        F: FnOnce(&ResolverHandle),
    {
        let found = self
            .lock()
            .iter()
            .find(|handle| handle.name() == name)
            .map(Arc::clone);
        match found {
            Some(handle) => {
                f(&handle);
                true
            }
            None => false,
        }
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("strategies", &self.strategy_names())
            .field("catalog", &self.catalog)
            .finish()
    }
}
