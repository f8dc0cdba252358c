pub mod config;
pub mod orchestrator;
pub mod transcript_log;
