pub mod channel;
pub mod cli;
pub mod config;
pub mod export;
pub mod form;
pub mod global;
pub mod session;
pub mod submission;
pub mod workflow;
