pub mod config;
pub mod error;
pub mod sample_buffer;
pub mod snapshot;
pub mod state;
