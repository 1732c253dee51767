//! Cytosol Script - RON program loader
//!
//! Loads cytosol programs and run configurations from RON:
//! - Program fragments (`records`, `externs`, `genes`, `rules`), merged in
//!   load order
//! - Run configuration (`step_limit`, `seed`)
//!
//! The merged program is validated by `cytosol_core::DeclTable::new`.

mod error;
mod loader;

pub use error::{Error, Result};
pub use loader::Loader;
