//! Micro-batched Text Classification Service Library

pub mod api;
pub mod backend;
pub mod config;
pub mod engine;
pub mod registry;
pub mod service;
pub mod utils;

pub use config::Config;
