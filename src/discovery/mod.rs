pub mod lifecycle;
pub mod registry;
pub mod resolver;

pub use lifecycle::{LifecycleState, ServiceHandle};
pub use registry::{ConsulRegistry, Registry, StaticRegistry};
pub use resolver::DiscoveryResolver;
