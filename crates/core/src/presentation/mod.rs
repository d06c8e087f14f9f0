pub mod overlay;
pub mod snapshot_recorder;
