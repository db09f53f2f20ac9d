//! On-disk state

pub mod layout;
pub mod settings;
pub mod snapshot;
