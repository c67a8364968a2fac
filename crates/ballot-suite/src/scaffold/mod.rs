//! GPU scaffold: naga-based GLSL compilation, the device capability
//! snapshot, and the ash compute executor the runner drives.

pub mod ash;
pub mod compile;
pub mod profile;

pub use ash::AshComputeExecutor;
