// Library surface for the binary, headless/integration tests and reuse.
pub mod analyzer;
pub mod app;
pub mod app_dirs;
pub mod audio_backend;
pub mod book;
pub mod config;
pub mod game_loop;
pub mod input;
pub mod ledger;
pub mod lesson;
pub mod logging;
pub mod physics;
pub mod runtime;
pub mod scheduler;
pub mod ui;
