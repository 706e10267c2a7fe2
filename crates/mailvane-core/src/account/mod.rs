//! Account management module.
//!
//! Provides account configuration, storage, and credential handling.

pub mod credentials;
mod model;
mod repository;

pub use model::{Account, AccountId, Security};
pub use repository::AccountRepository;
