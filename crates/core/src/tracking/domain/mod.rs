pub mod frame_sampler;
pub mod track;
pub mod track_associator;
pub mod track_finalizer;
pub mod tracker_config;
