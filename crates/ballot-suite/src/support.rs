//! Capability gating. A [`DeviceProfile`] is a plain snapshot of everything
//! the checks need, taken once per device (see [`crate::scaffold::profile`])
//! or written out literally in tests. [`check_support`] fails fast on the
//! first unmet requirement and returns the capability record program
//! generation consumes.

use crate::case::CaseDefinition;
use crate::error::{CaseError, CaseResult};
use crate::stage::{ShaderStage, StageSet};
use std::collections::BTreeSet;

pub const EXT_SHADER_SUBGROUP_BALLOT: &str = "VK_EXT_shader_subgroup_ballot";
pub const EXT_SUBGROUP_SIZE_CONTROL: &str = "VK_EXT_subgroup_size_control";
pub const KHR_RAY_TRACING_PIPELINE: &str = "VK_KHR_ray_tracing_pipeline";
pub const EXT_MESH_SHADER: &str = "VK_EXT_mesh_shader";

/// `VK_EXT_subgroup_size_control` feature and property snapshot.
#[derive(Debug, Clone, Default)]
pub struct SubgroupSizeControl {
    pub subgroup_size_control: bool,
    pub compute_full_subgroups: bool,
    pub min_subgroup_size: u32,
    pub max_subgroup_size: u32,
    /// Stages `requiredSubgroupSizeStages` reports as controllable.
    pub required_size_stages: Vec<ShaderStage>,
}

/// Everything the support checks read, queried once per device.
#[derive(Debug, Clone, Default)]
pub struct DeviceProfile {
    pub device_name: String,
    /// Subgroup operations available (Vulkan 1.1+ with ballot support).
    pub subgroup_supported: bool,
    pub subgroup_size: u32,
    /// Stages the device reports subgroup operations for.
    pub subgroup_stages: Vec<ShaderStage>,
    pub extensions: BTreeSet<String>,
    pub shader_int64: bool,
    pub size_control: SubgroupSizeControl,
    pub mesh_shader: bool,
    pub task_shader: bool,
    pub vertex_pipeline_stores_and_atomics: bool,
    pub tessellation_and_geometry_point_size: bool,
}

impl DeviceProfile {
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn supports_stage(&self, stage: ShaderStage) -> bool {
        self.subgroup_stages.contains(&stage)
    }
}

/// Capability record produced by the support check and consumed, by value,
/// by program generation.
#[derive(Debug, Clone, Copy)]
pub struct SupportedCaps {
    pub point_size_supported: bool,
}

/// Fail-fast support check for one case. An `Err(NotSupported)` is a skip.
pub fn check_support(profile: &DeviceProfile, case: &CaseDefinition) -> CaseResult<SupportedCaps> {
    if !profile.subgroup_supported {
        return not_supported("subgroup operations are not supported");
    }

    if !profile.has_extension(EXT_SHADER_SUBGROUP_BALLOT) {
        return not_supported("device does not support VK_EXT_shader_subgroup_ballot extension");
    }

    if !profile.shader_int64 {
        return not_supported("int64 is not supported");
    }

    if case.required_subgroup_size {
        if !profile.has_extension(EXT_SUBGROUP_SIZE_CONTROL) {
            return not_supported("device does not support VK_EXT_subgroup_size_control extension");
        }
        if !profile.size_control.subgroup_size_control {
            return not_supported(
                "device does not support varying subgroup sizes nor required subgroup size",
            );
        }
        if !profile.size_control.compute_full_subgroups {
            return not_supported("device does not support full subgroups in compute shaders");
        }
        let controllable = case
            .stage_set
            .active_stages()
            .iter()
            .all(|stage| profile.size_control.required_size_stages.contains(stage));
        if !controllable {
            return not_supported("required subgroup size is not supported for shader stage");
        }
    }

    match case.stage_set {
        StageSet::AllRayTracing => {
            if !profile.has_extension(KHR_RAY_TRACING_PIPELINE) {
                return not_supported("device does not support VK_KHR_ray_tracing_pipeline");
            }
        }
        StageSet::Mesh(mesh_stage) => {
            if !profile.vertex_pipeline_stores_and_atomics {
                return not_supported("vertex pipeline stores and atomics are not supported");
            }
            if !profile.has_extension(EXT_MESH_SHADER) || !profile.mesh_shader {
                return not_supported("device does not support VK_EXT_mesh_shader");
            }
            if mesh_stage == crate::stage::MeshStage::Task && !profile.task_shader {
                return not_supported("task shaders not supported");
            }
        }
        StageSet::Compute | StageSet::AllGraphics | StageSet::Framebuffer(_) => {}
    }

    // Stage-level subgroup support for everything the case will exercise.
    // The graphics set is resolved down to the exercisable subset later, so
    // only vertex support is a hard requirement there.
    let must_support: &[ShaderStage] = match case.stage_set {
        StageSet::AllGraphics => &[ShaderStage::Vertex, ShaderStage::Fragment],
        _ => case.stage_set.active_stages(),
    };
    for stage in must_support {
        if !profile.supports_stage(*stage) {
            return not_supported(&format!(
                "subgroup operations are not supported in the {} stage",
                stage.name()
            ));
        }
    }

    Ok(SupportedCaps {
        point_size_supported: profile.tessellation_and_geometry_point_size,
    })
}

/// The graphics stages this device can actually exercise for an all-graphics
/// case, in pipeline order.
pub fn resolve_graphics_stages(profile: &DeviceProfile) -> Vec<ShaderStage> {
    StageSet::AllGraphics
        .active_stages()
        .iter()
        .copied()
        .filter(|stage| profile.supports_stage(*stage))
        .collect()
}

/// Same resolution for the ray-tracing stage set.
pub fn resolve_ray_tracing_stages(profile: &DeviceProfile) -> Vec<ShaderStage> {
    StageSet::AllRayTracing
        .active_stages()
        .iter()
        .copied()
        .filter(|stage| profile.supports_stage(*stage))
        .collect()
}

fn not_supported<T>(reason: &str) -> CaseResult<T> {
    Err(CaseError::NotSupported(reason.to_string()))
}
