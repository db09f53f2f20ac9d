//! Client-side deployment state

pub mod deployments;
pub mod providers;
pub mod snapshot;
