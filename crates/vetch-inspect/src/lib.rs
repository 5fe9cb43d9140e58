//! Indexed traversal for the vetch analysis engine.
//!
//! The [`Inspector`] precomputes a pre-order event array over a package's
//! syntax trees; [`Cursor`]s navigate it in O(1) per step, and
//! [`TypeIndex`] adds reverse lookups from resolved objects to their
//! definition, use, and call sites.

pub mod cursor;
pub mod index;
pub mod inspector;

pub use cursor::{Ancestors, Children, Cursor, Preorder};
pub use index::{package_object, selection, static_callee, TypeIndex};
pub use inspector::Inspector;
