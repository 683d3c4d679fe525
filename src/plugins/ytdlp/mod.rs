pub mod cli;
pub mod engine;
pub mod info;
pub mod progress;
