use crate::mask::MaskType;
use crate::stage::StageSet;
use std::fmt::{Display, Formatter};

/// One enumerated combination of mask type, stage class and subgroup-size
/// requirement. Immutable once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseDefinition {
    pub mask_type: MaskType,
    pub stage_set: StageSet,
    pub required_subgroup_size: bool,
}

impl CaseDefinition {
    /// Case name: lowercase built-in, `_requiredsubgroupsize` when the sweep
    /// is requested, stage suffix where one mask type registers several
    /// cases in the same group.
    pub fn name(&self) -> String {
        let mut name = self.mask_type.case_name();
        if self.required_subgroup_size {
            name.push_str("_requiredsubgroupsize");
        }
        match self.stage_set {
            StageSet::Mesh(stage) => {
                name.push('_');
                name.push_str(stage.shader_stage().name());
            }
            StageSet::Framebuffer(stage) => {
                name.push('_');
                name.push_str(stage.shader_stage().name());
            }
            StageSet::Compute | StageSet::AllGraphics | StageSet::AllRayTracing => {}
        }
        name
    }
}

impl Display for CaseDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{FramebufferStage, MeshStage};

    #[test]
    fn compute_names() {
        let case = CaseDefinition {
            mask_type: MaskType::Eq,
            stage_set: StageSet::Compute,
            required_subgroup_size: false,
        };
        assert_eq!(case.name(), "gl_subgroupeqmaskarb");

        let case = CaseDefinition {
            required_subgroup_size: true,
            ..case
        };
        assert_eq!(case.name(), "gl_subgroupeqmaskarb_requiredsubgroupsize");
    }

    #[test]
    fn mesh_and_framebuffer_names_carry_the_stage() {
        let case = CaseDefinition {
            mask_type: MaskType::Gt,
            stage_set: StageSet::Mesh(MeshStage::Task),
            required_subgroup_size: true,
        };
        assert_eq!(case.name(), "gl_subgroupgtmaskarb_requiredsubgroupsize_task");

        let case = CaseDefinition {
            mask_type: MaskType::Lt,
            stage_set: StageSet::Framebuffer(FramebufferStage::TessEval),
            required_subgroup_size: false,
        };
        assert_eq!(case.name(), "gl_subgroupltmaskarb_tess_eval");
    }
}
