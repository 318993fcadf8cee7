//! # Rem Architecture
//!
//! Rem is a **UI-agnostic scratch-stack library**: a bounded, persistent
//! LIFO of content blobs kept under the user's configuration directory.
//! Terminal UIs, CLI entry points and clipboard bridges are clients of
//! this crate, never part of it.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Stack Manager (stack.rs)                                   │
//! │  - push / list / get / get_content / delete / clear / size  │
//! │  - monotonic timestamp identity, bounded eviction           │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                          │
//!                  ▼                          ▼
//! ┌───────────────────────────┐  ┌────────────────────────────┐
//! │  Content (content.rs)     │  │  Migration (migrate.rs)    │
//! │  - binary classification  │  │  - one-shot legacy copy,   │
//! │  - title derivation       │  │    marker-gated            │
//! └───────────────────────────┘  └────────────────────────────┘
//!                  │                          │
//!                  ▼                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Scoped Filesystem (fs/)                                    │
//! │  - ScopedFs trait, root-confined, validated paths           │
//! │  - DiskFs (production), MemFs (testing)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principles
//!
//! - **Files are truth.** Item identity and ordering live in timestamp
//!   filenames; size, fingerprint and title are re-derived from content.
//!   There is nothing to corrupt but the files themselves.
//! - **Single process, no locking.** All operations are synchronous and
//!   blocking; concurrent processes sharing a store may race on eviction
//!   but can never corrupt an individual file.
//! - **Foreign files are sacred.** Anything in the store directory whose
//!   name does not parse as a store timestamp is ignored by listing,
//!   eviction and clear alike.
//!
//! ## Module Overview
//!
//! - [`stack`]: the store proper, [`StackManager`]
//! - [`content`]: binary detection and title derivation
//! - [`fs`]: the scoped filesystem trait and its two implementations
//! - [`migrate`]: legacy `content/` to `history/` migration
//! - [`model`]: [`Item`], store constants, the timestamp filename codec
//! - [`error`]: [`RemError`] and the crate [`Result`] alias

pub mod content;
pub mod error;
pub mod fs;
pub mod migrate;
pub mod model;
pub mod stack;

pub use error::{RemError, Result};
pub use model::Item;
pub use stack::StackManager;
