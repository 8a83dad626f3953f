/// Reference resolution module.
///
/// Holds the ordered registry of resolver handles and the dispatcher that
/// picks, for each signed reference, the first handle able to produce its
/// content.
mod dispatcher;
mod handle;
mod registry;

pub use dispatcher::Dispatcher;
pub use handle::{Isolated, ResolverHandle};
pub use registry::{Position, RegistrySnapshot, Registration, ResolverRegistry};
