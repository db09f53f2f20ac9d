//! Background workers

pub mod listener;
pub mod persister;
pub mod poller;
pub mod refresher;
