//! Deployment lifecycle

pub mod build_log;
pub mod fsm;
pub mod registry;
pub mod runner;
pub mod service;
pub mod simulator;
pub mod timing;
