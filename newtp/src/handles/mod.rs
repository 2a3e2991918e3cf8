// (c) 2025 Ross Younger

//! Handles and the paths they refer to
//!
//! Each session owns a [`HandleTable`]: a fixed number of slots, indexed by the
//! client-chosen handle id. A slot is either empty or holds a [`Handle`].
//!
//! A handle remembers the path the client assigned, not the filesystem path it maps to.
//! The filesystem path is worked out on demand by [`Handle::resolve`], which
//! closes the handle's descriptors if the answer has changed.

mod path;
mod table;

pub use path::{Resolved, resolve, split, validate_path};
pub use table::{Handle, HandleTable};
pub(crate) use table::{Cursor, FileMode, Listing};
