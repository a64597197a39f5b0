pub mod audio;
pub mod config;
pub mod gateway;
pub mod runtime;
pub mod sound;
pub mod store;
pub mod ui;
