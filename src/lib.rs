pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod file_store;
pub mod ingest;
pub mod intake;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod transform;
