//! Client-side ordered-list cache for the admin console: paginated fetches,
//! drag-driven reordering persisted locally, and reset to the fetched order.

pub mod auth;
pub mod cache;
pub mod console;
pub mod controller;
pub mod drag;
pub mod fetcher;
pub mod pagination;
pub mod session;
pub mod transport;

pub use auth::{AuthClient, AuthGrant, Authenticator};
pub use cache::{PageCache, PageStore};
pub use console::{AdminConsole, ConsoleStatus};
pub use controller::OrderedListController;
pub use drag::{DragGesture, MoveIntent};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use pagination::{PageLoad, PaginationController};
pub use session::{SessionAction, SessionGate, SessionState, SessionStore};
pub use transport::ApiEndpoint;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
