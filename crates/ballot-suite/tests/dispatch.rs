//! Drives [`run_case`] end to end against a CPU-model executor: the mock
//! hands each invocation the mask value the device would, evaluates the same
//! per-invocation checks the generated shader body performs, and records
//! every dispatch so the tests can observe the required-subgroup-size sweep.

use ballot_suite::program::{COMPUTE_LOCAL_SIZE, ProgramInputs};
use ballot_suite::registry::{RegistryConfig, build_ballot_mask_tree};
use ballot_suite::run::{SubgroupExecutor, run_case};
use ballot_suite::support::{
    DeviceProfile, EXT_MESH_SHADER, EXT_SHADER_SUBGROUP_BALLOT, EXT_SUBGROUP_SIZE_CONTROL,
    KHR_RAY_TRACING_PIPELINE, SubgroupSizeControl,
};
use ballot_suite::{
    CaseDefinition, CaseError, CaseResult, FramebufferStage, MaskType, MeshStage, ShaderStage,
    StageSet,
};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Compute(Option<u32>),
    Mesh(Option<u32>),
    Graphics(usize),
    RayTracing(usize),
    Framebuffer(FramebufferStage),
}

/// Simulates a device whose ballot masks are correct except at the sizes
/// listed in `corrupt_sizes`, where one mask bit is flipped.
struct MockExecutor {
    default_size: u32,
    corrupt_sizes: HashSet<u32>,
    calls: Mutex<Vec<Call>>,
}

impl MockExecutor {
    fn new(default_size: u32) -> Self {
        Self {
            default_size,
            corrupt_sizes: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn corrupt_at(mut self, size: u32) -> Self {
        self.corrupt_sizes.insert(size);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// The mask check the generated body performs, applied to one
    /// invocation's mask value. The eq body tests only the invocation's own
    /// bit; the relational bodies walk every bit of the subgroup.
    fn evaluate(mask_type: MaskType, mask: u64, invocation: u32, size: u32) -> u32 {
        let ok = match mask_type {
            MaskType::Eq => mask & (1u64 << invocation) != 0,
            _ => (0..size).all(|bit| {
                let set = mask & (1u64 << bit) != 0;
                set == mask_type.bit_expected(bit, invocation)
            }),
        };
        if ok { 0xf } else { 0x2 }
    }

    fn simulate(&self, programs: &ProgramInputs, size: u32) -> Vec<u32> {
        let mask_type = mask_type_of(programs);
        (0..COMPUTE_LOCAL_SIZE)
            .map(|global_id| {
                let invocation = global_id % size;
                let mut mask = mask_type.expected_mask(invocation, size);
                if self.corrupt_sizes.contains(&size) {
                    mask ^= 1u64 << ((invocation + 1) % size);
                }
                Self::evaluate(mask_type, mask, invocation, size)
            })
            .collect()
    }
}

/// Recovers the case's mask type from the generated body.
fn mask_type_of(programs: &ProgramInputs) -> MaskType {
    MaskType::ALL
        .into_iter()
        .find(|mask_type| programs.body.contains(mask_type.builtin_name()))
        .expect("generated body names no ballot mask built-in")
}

impl SubgroupExecutor for MockExecutor {
    fn run_compute(
        &self,
        programs: &ProgramInputs,
        required_subgroup_size: Option<u32>,
    ) -> CaseResult<Vec<u32>> {
        self.record(Call::Compute(required_subgroup_size));
        Ok(self.simulate(programs, required_subgroup_size.unwrap_or(self.default_size)))
    }

    fn run_mesh(
        &self,
        programs: &ProgramInputs,
        required_subgroup_size: Option<u32>,
    ) -> CaseResult<Vec<u32>> {
        self.record(Call::Mesh(required_subgroup_size));
        Ok(self.simulate(programs, required_subgroup_size.unwrap_or(self.default_size)))
    }

    fn run_graphics(
        &self,
        programs: &ProgramInputs,
        stages: &[ShaderStage],
    ) -> CaseResult<Vec<u32>> {
        self.record(Call::Graphics(stages.len()));
        Ok(self.simulate(programs, self.default_size))
    }

    fn run_ray_tracing(
        &self,
        programs: &ProgramInputs,
        stages: &[ShaderStage],
    ) -> CaseResult<Vec<u32>> {
        self.record(Call::RayTracing(stages.len()));
        Ok(self.simulate(programs, self.default_size))
    }

    fn run_framebuffer(
        &self,
        programs: &ProgramInputs,
        stage: FramebufferStage,
    ) -> CaseResult<Vec<u32>> {
        self.record(Call::Framebuffer(stage));
        Ok(self.simulate(programs, self.default_size))
    }
}

fn full_profile() -> DeviceProfile {
    DeviceProfile {
        device_name: "mock device".to_string(),
        subgroup_supported: true,
        subgroup_size: 32,
        subgroup_stages: vec![
            ShaderStage::Vertex,
            ShaderStage::TessControl,
            ShaderStage::TessEval,
            ShaderStage::Geometry,
            ShaderStage::Fragment,
            ShaderStage::Compute,
            ShaderStage::Mesh,
            ShaderStage::Task,
            ShaderStage::RayGen,
            ShaderStage::AnyHit,
            ShaderStage::ClosestHit,
            ShaderStage::Miss,
            ShaderStage::Intersection,
            ShaderStage::Callable,
        ],
        extensions: [
            EXT_SHADER_SUBGROUP_BALLOT,
            EXT_SUBGROUP_SIZE_CONTROL,
            KHR_RAY_TRACING_PIPELINE,
            EXT_MESH_SHADER,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        shader_int64: true,
        size_control: SubgroupSizeControl {
            subgroup_size_control: true,
            compute_full_subgroups: true,
            min_subgroup_size: 4,
            max_subgroup_size: 64,
            required_size_stages: vec![ShaderStage::Compute, ShaderStage::Mesh, ShaderStage::Task],
        },
        mesh_shader: true,
        task_shader: true,
        vertex_pipeline_stores_and_atomics: true,
        tessellation_and_geometry_point_size: true,
    }
}

fn compute_case(mask_type: MaskType, required_subgroup_size: bool) -> CaseDefinition {
    CaseDefinition {
        mask_type,
        stage_set: StageSet::Compute,
        required_subgroup_size,
    }
}

#[test]
fn plain_compute_case_runs_once_and_passes() {
    let executor = MockExecutor::new(32);
    run_case(&executor, &full_profile(), &compute_case(MaskType::Ge, false)).unwrap();
    assert_eq!(executor.calls(), vec![Call::Compute(None)]);
}

#[test]
fn required_size_case_sweeps_every_power_of_two() {
    let executor = MockExecutor::new(32);
    run_case(&executor, &full_profile(), &compute_case(MaskType::Lt, true)).unwrap();
    assert_eq!(
        executor.calls(),
        vec![
            Call::Compute(Some(4)),
            Call::Compute(Some(8)),
            Call::Compute(Some(16)),
            Call::Compute(Some(32)),
            Call::Compute(Some(64)),
        ]
    );
}

#[test]
fn sweep_halts_at_the_first_failing_size() {
    let executor = MockExecutor::new(32).corrupt_at(8);
    let err = run_case(&executor, &full_profile(), &compute_case(MaskType::Ge, true)).unwrap_err();
    match &err {
        CaseError::Fail(message) => {
            assert!(message.contains("subgroup size 8"), "{message}");
            assert!(message.contains("invocation"), "{message}");
        }
        other => panic!("expected a failure, got {other:?}"),
    }
    // Sizes past the failing one are never attempted.
    assert_eq!(
        executor.calls(),
        vec![Call::Compute(Some(4)), Call::Compute(Some(8))]
    );
}

#[test]
fn eq_body_misses_foreign_bit_corruption() {
    // The eq body checks only the invocation's own bit, so flipping a
    // neighbouring bit goes unnoticed. The relational bodies catch it.
    let executor = MockExecutor::new(32).corrupt_at(32);
    run_case(&executor, &full_profile(), &compute_case(MaskType::Eq, false)).unwrap();
    let executor = MockExecutor::new(32).corrupt_at(32);
    assert!(run_case(&executor, &full_profile(), &compute_case(MaskType::Le, false)).is_err());
}

#[test]
fn every_stage_class_routes_to_its_runner() {
    let executor = MockExecutor::new(32);
    let profile = full_profile();
    let cases = [
        (
            StageSet::Mesh(MeshStage::Task),
            Call::Mesh(None),
        ),
        (StageSet::AllGraphics, Call::Graphics(5)),
        (StageSet::AllRayTracing, Call::RayTracing(6)),
        (
            StageSet::Framebuffer(FramebufferStage::Geometry),
            Call::Framebuffer(FramebufferStage::Geometry),
        ),
    ];
    for (stage_set, expected) in cases {
        let case = CaseDefinition {
            mask_type: MaskType::Gt,
            stage_set,
            required_subgroup_size: false,
        };
        run_case(&executor, &profile, &case).unwrap();
        assert_eq!(*executor.calls().last().unwrap(), expected);
    }
}

#[test]
fn graphics_stages_resolve_to_the_supported_subset() {
    let executor = MockExecutor::new(32);
    let mut profile = full_profile();
    profile
        .subgroup_stages
        .retain(|s| !matches!(s, ShaderStage::TessControl | ShaderStage::TessEval));
    let case = CaseDefinition {
        mask_type: MaskType::Eq,
        stage_set: StageSet::AllGraphics,
        required_subgroup_size: false,
    };
    run_case(&executor, &profile, &case).unwrap();
    assert_eq!(executor.calls(), vec![Call::Graphics(3)]);
}

#[test]
fn missing_ballot_extension_skips_the_whole_tree() {
    let executor = MockExecutor::new(32);
    let mut profile = full_profile();
    profile.extensions.remove(EXT_SHADER_SUBGROUP_BALLOT);

    for flat in build_ballot_mask_tree(RegistryConfig::default()).flatten() {
        let err = run_case(&executor, &profile, &flat.case).unwrap_err();
        assert!(err.is_skip(), "{}: {err}", flat.full_name);
    }
    assert!(executor.calls().is_empty());
}

#[test]
fn invalid_minimum_subgroup_size_is_an_internal_error() {
    let executor = MockExecutor::new(32);
    let mut profile = full_profile();
    profile.size_control.min_subgroup_size = 0;
    let err = run_case(&executor, &profile, &compute_case(MaskType::Eq, true)).unwrap_err();
    assert!(matches!(err, CaseError::Internal(_)));
    assert!(executor.calls().is_empty());
}

#[test]
fn executor_without_a_pipeline_runner_turns_into_a_skip() {
    struct ComputeOnly;
    impl SubgroupExecutor for ComputeOnly {
        fn run_compute(&self, _: &ProgramInputs, _: Option<u32>) -> CaseResult<Vec<u32>> {
            Ok(vec![0xf; COMPUTE_LOCAL_SIZE as usize])
        }
        fn run_mesh(&self, _: &ProgramInputs, _: Option<u32>) -> CaseResult<Vec<u32>> {
            Err(CaseError::NotSupported("no mesh runner".to_string()))
        }
        fn run_graphics(&self, _: &ProgramInputs, _: &[ShaderStage]) -> CaseResult<Vec<u32>> {
            Err(CaseError::NotSupported("no graphics runner".to_string()))
        }
        fn run_ray_tracing(&self, _: &ProgramInputs, _: &[ShaderStage]) -> CaseResult<Vec<u32>> {
            Err(CaseError::NotSupported("no ray-tracing runner".to_string()))
        }
        fn run_framebuffer(&self, _: &ProgramInputs, _: FramebufferStage) -> CaseResult<Vec<u32>> {
            Err(CaseError::NotSupported("no framebuffer runner".to_string()))
        }
    }

    let profile = full_profile();
    run_case(&ComputeOnly, &profile, &compute_case(MaskType::Eq, false)).unwrap();
    let graphics = CaseDefinition {
        mask_type: MaskType::Eq,
        stage_set: StageSet::AllGraphics,
        required_subgroup_size: false,
    };
    assert!(run_case(&ComputeOnly, &profile, &graphics).unwrap_err().is_skip());
}
