//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route + prefix length, or no match
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by priority
//!     → Parse upstream authority
//!     → Freeze as immutable Router
//! ```

pub mod matcher;
pub mod router;

pub use matcher::RequestTarget;
pub use router::{Route, RouteMatch, Router};
