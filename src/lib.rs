#![forbid(unsafe_code)]

pub mod app;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod formats;
pub mod generation;
pub mod logging;
pub mod openai;
pub mod outline;
pub mod search;
pub mod serp_analysis;
pub mod state_store;
pub mod text;
