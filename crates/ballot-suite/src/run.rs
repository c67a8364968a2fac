//! Execution dispatch. [`run_case`] sequences the two phases of a case
//! (support check, then program generation from the returned capability
//! record) and hands the generated programs to a [`SubgroupExecutor`], the
//! seam to the actual test-execution engine.

use crate::case::CaseDefinition;
use crate::error::{CaseError, CaseResult};
use crate::program::{ProgramInputs, build_framebuffer_programs, build_programs};
use crate::stage::{FramebufferStage, ShaderStage, StageSet};
use crate::support::{
    DeviceProfile, check_support, resolve_graphics_stages, resolve_ray_tracing_stages,
};
use crate::validate::check_invocation_results;
use tracing::{error, info};

/// Runs generated programs and reports the per-invocation result words.
///
/// One method per stage class; each implementation may report
/// `CaseError::NotSupported` for classes it has no pipeline runner for.
pub trait SubgroupExecutor {
    fn run_compute(
        &self,
        programs: &ProgramInputs,
        required_subgroup_size: Option<u32>,
    ) -> CaseResult<Vec<u32>>;

    fn run_mesh(
        &self,
        programs: &ProgramInputs,
        required_subgroup_size: Option<u32>,
    ) -> CaseResult<Vec<u32>>;

    fn run_graphics(&self, programs: &ProgramInputs, stages: &[ShaderStage])
    -> CaseResult<Vec<u32>>;

    fn run_ray_tracing(
        &self,
        programs: &ProgramInputs,
        stages: &[ShaderStage],
    ) -> CaseResult<Vec<u32>>;

    fn run_framebuffer(
        &self,
        programs: &ProgramInputs,
        stage: FramebufferStage,
    ) -> CaseResult<Vec<u32>>;
}

/// Runs one case to completion: support check, program generation, dispatch
/// by stage class, result validation.
pub fn run_case<E: SubgroupExecutor>(
    executor: &E,
    profile: &DeviceProfile,
    case: &CaseDefinition,
) -> CaseResult<()> {
    let caps = check_support(profile, case)?;

    match case.stage_set {
        StageSet::Compute | StageSet::Mesh(_) => {
            let programs = build_programs(case, &caps);
            run_compute_or_mesh(executor, profile, case, &programs)
        }
        StageSet::AllGraphics => {
            let programs = build_programs(case, &caps);
            let stages = resolve_graphics_stages(profile);
            check_invocation_results(&executor.run_graphics(&programs, &stages)?)
        }
        StageSet::AllRayTracing => {
            let programs = build_programs(case, &caps);
            let stages = resolve_ray_tracing_stages(profile);
            check_invocation_results(&executor.run_ray_tracing(&programs, &stages)?)
        }
        StageSet::Framebuffer(stage) => {
            let programs = build_framebuffer_programs(case, &caps);
            check_invocation_results(&executor.run_framebuffer(&programs, stage)?)
        }
    }
}

fn run_compute_or_mesh<E: SubgroupExecutor>(
    executor: &E,
    profile: &DeviceProfile,
    case: &CaseDefinition,
    programs: &ProgramInputs,
) -> CaseResult<()> {
    let run_once = |size: Option<u32>| -> CaseResult<Vec<u32>> {
        match case.stage_set {
            StageSet::Mesh(_) => executor.run_mesh(programs, size),
            _ => executor.run_compute(programs, size),
        }
    };

    if !case.required_subgroup_size {
        return check_invocation_results(&run_once(None)?);
    }

    let min = profile.size_control.min_subgroup_size;
    let max = profile.size_control.max_subgroup_size;
    if min == 0 || !min.is_power_of_two() {
        return Err(CaseError::Internal(format!(
            "device reports invalid minimum subgroup size {min}"
        )));
    }

    info!(min, max, "testing required subgroup size range");

    // requiredSubgroupSize must be a power-of-two integer.
    let mut size = min;
    while size <= max {
        let results = run_once(Some(size))?;
        if let Err(err) = check_invocation_results(&results) {
            error!(size, "subgroup size failed");
            return Err(CaseError::Fail(format!("subgroup size {size}: {err}")));
        }
        size *= 2;
    }

    Ok(())
}
