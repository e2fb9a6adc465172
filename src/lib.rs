pub mod actions;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod persistence;
pub mod router;
pub mod task;
