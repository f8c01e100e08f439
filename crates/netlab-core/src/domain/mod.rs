//! Domain types shared across the generator and the checker layer.

pub mod error;

pub use error::{NetlabError, Result};
