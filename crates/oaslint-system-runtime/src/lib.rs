/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * File system abstraction layer for the oaslint analysis engine.
 */

//! # oaslint-system-runtime
//!
//! The analysis engine never touches a concrete file system or transport.
//! Everything it reads goes through the [`FileSystem`] trait defined here, and
//! every `$ref` it follows is turned into a document address by a
//! [`UriResolver`].
//!
//! Two implementations are provided:
//! - [`NativeFileSystem`]: tokio file I/O, glob patterns, notify watchers
//! - [`MemoryFileSystem`]: an in-memory map for tests and unsaved editor buffers
//!
//! All document addresses are [`Uri`] values, which are normalized on
//! construction (fragment and query stripped, scheme and path canonical) so
//! they can be used directly as map keys.

mod error;
mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;
mod traits;
mod uri;

pub use error::{RuntimeError, RuntimeResult};
pub use memory::MemoryFileSystem;
#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeFileSystem;
pub use traits::{
    ChangeCallback, FileContent, FileSystem, UriResolver, UrlResolver, WatchHandle, content_hash,
};
pub use uri::{Uri, normalize_uri};
