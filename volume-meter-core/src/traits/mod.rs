pub mod capture_source;
pub mod delivery_context;
pub mod sample_sink;
pub mod volume_observer;
