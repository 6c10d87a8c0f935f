pub mod app;
pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod output;
pub mod query;
pub mod reconcile;
pub mod retrieval;
pub mod sequences;
pub mod table;
pub mod workspace;
