//! Services module
//!
//! External collaborators of the ordering flow: the catalog, the order
//! backend and the outbound notification queue.

pub mod catalog;
pub mod notification;
pub mod order;

// Re-export commonly used services
pub use catalog::{CatalogProvider, StaticCatalog, TenantCatalog};
pub use notification::{NotificationQueue, OutboundMessage};
pub use order::{InMemoryOrderBook, OrderService, OrderStatus, StoredOrder};
