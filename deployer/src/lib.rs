//! Kebulan Deployer Library
//!
//! Deployment lifecycle simulation for the AI app builder: an authoritative
//! deployment service, its simulated build process, and the client-side store
//! that caches and polls it.

pub mod app;
pub mod demo;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod store;
pub mod utils;
pub mod workers;
