//! Large Ordered List (LLIST) Module
//!
//! A type-homogeneous, sorted collection stored under a single bin.
//!
//! ## State Machine
//! ```text
//!            add                       add (same type) / remove (n > 1)
//! ABSENT ──────────▶ TYPED (n >= 1) ◀─────────────────────────────────┐
//!   ▲                      │  └──────────────────────────────────────┘
//!   └──────────────────────┘
//!      remove (last) / destroy
//! ```
//!
//! The element type is fixed by the first add. Elements stay sorted by the
//! natural order of that type; equal elements keep insertion order.

mod filter;
mod list;

pub use filter::ElementFilter;
pub use list::LargeList;
