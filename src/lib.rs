// Library exports for mark
// This allows the test suite to import modules

pub mod app;
pub mod cli;
pub mod config;
pub mod event;
pub mod event_handler;
pub mod ipc;
pub mod llm;
pub mod logging;
pub mod registry;
pub mod session;
pub mod ui;
