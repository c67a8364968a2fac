//! Conformance cases for the subgroup ballot-mask built-ins exposed by
//! `VK_EXT_shader_subgroup_ballot` (`gl_SubGroupEqMaskARB` and friends).
//!
//! The suite enumerates one case per mask type, stage class and
//! subgroup-size requirement, synthesizes the GLSL that checks the mask
//! against the invocation's own subgroup index, gates each case on the
//! device's capabilities, and validates the per-invocation result words
//! reported back by the shader. Execution goes through the
//! [`run::SubgroupExecutor`] seam; an ash-based compute executor is bundled
//! in [`scaffold`], everything else is the surrounding framework's job.

pub mod case;
pub mod config;
pub mod error;
pub mod glsl;
pub mod mask;
pub mod program;
pub mod registry;
pub mod run;
pub mod scaffold;
pub mod stage;
pub mod support;
pub mod validate;

pub use case::CaseDefinition;
pub use config::HarnessConfig;
pub use error::{CaseError, CaseResult};
pub use mask::MaskType;
pub use registry::{RegistryConfig, build_ballot_mask_tree};
pub use stage::{FramebufferStage, MeshStage, ShaderStage, StageSet};
