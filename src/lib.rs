pub mod captions;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod planning;
pub mod signals;
pub mod types;
