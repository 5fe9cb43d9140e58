//! Type layer for the vetch analysis engine.
//!
//! Provides the type algebra ([`ty`]), declared objects and packages
//! ([`object`]), the universe scope ([`universe`]), curated standard-library
//! models ([`stdlib`]), the scope-aware resolver ([`resolve`]), structural
//! type fingerprints ([`fingerprint`]), stable object paths for fact keys
//! ([`objectpath`]), and the language-version gate ([`version`]).
//!
//! The resolver is deliberately a "checker-lite": it binds every identifier
//! and computes types for the expression shapes analyzers rely on, records
//! genuine errors without aborting, and degrades to the invalid type where
//! full inference would be needed.

pub mod fingerprint;
pub mod info;
pub mod object;
pub mod objectpath;
pub mod resolve;
pub mod stdlib;
pub mod ty;
pub mod universe;
pub mod version;

pub use info::{TypeError, TypesInfo};
pub use object::{Builtin, ObjId, ObjKind, Object, ObjectStore, Package, PkgId};
pub use objectpath::{object_for_path, object_path};
pub use resolve::{resolve, Config, Resolution};
pub use stdlib::StdImporter;
pub use ty::{BasicKind, ChanDir, StructField, TypeId, TypeKind, TypeStore};
pub use universe::Universe;
pub use version::{at_least, compare, file_uses_version};
