//! Integration tests

mod common;
mod test_persistence;
mod test_server;
mod test_store;
mod test_workers;
