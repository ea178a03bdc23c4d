//! Admin front end for a personal library catalog
//!
//! The core is the guided entity wizard in [`guide`]; [`api`] holds the
//! backend seam and its REST and in-memory implementations.

pub mod api;
pub mod config;
pub mod error;
pub mod guide;
pub mod models;
pub mod pagination;
pub mod state;

pub use api::{Catalog, LibraryClient, MemoryCatalog};
pub use config::ClientConfig;
pub use error::{LibraryError, Result};
pub use guide::{GuideKind, Wizard};
pub use state::AppState;
