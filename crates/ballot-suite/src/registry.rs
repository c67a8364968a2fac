//! Test-tree registration. Builds the nested named groups
//! `ballot_mask/ext_shader_subgroup_ballot/{graphics, compute, framebuffer,
//! ray_tracing, mesh}` with one case per enumerated combination. The
//! enumeration is exhaustive and deterministic: the same tree comes out on
//! every run.

use crate::case::CaseDefinition;
use crate::mask::MaskType;
use crate::stage::{FramebufferStage, MeshStage, StageSet};

/// Which optional sections to enumerate. Restricted build configurations
/// leave out mesh shading and ray tracing.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub mesh: bool,
    pub ray_tracing: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mesh: true,
            ray_tracing: true,
        }
    }
}

/// A named group holding cases and nested groups.
#[derive(Debug, Clone)]
pub struct TestNode {
    pub name: String,
    pub children: Vec<TestNode>,
    pub cases: Vec<RegisteredCase>,
}

/// A case registered under its group-local name.
#[derive(Debug, Clone)]
pub struct RegisteredCase {
    pub name: String,
    pub case: CaseDefinition,
}

/// A case with its `::`-joined full path, as the runner consumes it.
#[derive(Debug, Clone)]
pub struct FlatCase {
    pub full_name: String,
    pub case: CaseDefinition,
}

impl TestNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            cases: Vec::new(),
        }
    }

    fn register(&mut self, case: CaseDefinition) {
        self.cases.push(RegisteredCase {
            name: case.name(),
            case,
        });
    }

    /// Depth-first flattening in registration order.
    pub fn flatten(&self) -> Vec<FlatCase> {
        let mut flat = Vec::new();
        self.collect(&self.name, &mut flat);
        flat
    }

    fn collect(&self, prefix: &str, flat: &mut Vec<FlatCase>) {
        for child in &self.children {
            let child_prefix = format!("{prefix}::{}", child.name);
            child.collect(&child_prefix, flat);
        }
        for registered in &self.cases {
            flat.push(FlatCase {
                full_name: format!("{prefix}::{}", registered.name),
                case: registered.case,
            });
        }
    }
}

/// Builds the ballot-mask tree for `VK_EXT_shader_subgroup_ballot`.
pub fn build_ballot_mask_tree(config: RegistryConfig) -> TestNode {
    let mut graphics = TestNode::new("graphics");
    let mut compute = TestNode::new("compute");
    let mut framebuffer = TestNode::new("framebuffer");
    let mut ray_tracing = TestNode::new("ray_tracing");
    let mut mesh = TestNode::new("mesh");

    for mask_type in MaskType::ALL {
        for required_subgroup_size in [false, true] {
            compute.register(CaseDefinition {
                mask_type,
                stage_set: StageSet::Compute,
                required_subgroup_size,
            });
        }

        if config.mesh {
            for required_subgroup_size in [false, true] {
                for mesh_stage in MeshStage::ALL {
                    mesh.register(CaseDefinition {
                        mask_type,
                        stage_set: StageSet::Mesh(mesh_stage),
                        required_subgroup_size,
                    });
                }
            }
        }

        graphics.register(CaseDefinition {
            mask_type,
            stage_set: StageSet::AllGraphics,
            required_subgroup_size: false,
        });

        if config.ray_tracing {
            ray_tracing.register(CaseDefinition {
                mask_type,
                stage_set: StageSet::AllRayTracing,
                required_subgroup_size: false,
            });
        }

        for fb_stage in FramebufferStage::ALL {
            framebuffer.register(CaseDefinition {
                mask_type,
                stage_set: StageSet::Framebuffer(fb_stage),
                required_subgroup_size: false,
            });
        }
    }

    let mut group_arb = TestNode::new("ext_shader_subgroup_ballot");
    group_arb.children.push(graphics);
    group_arb.children.push(compute);
    group_arb.children.push(framebuffer);
    if config.ray_tracing {
        group_arb.children.push(ray_tracing);
    }
    if config.mesh {
        group_arb.children.push(mesh);
    }

    let mut root = TestNode::new("ballot_mask");
    root.children.push(group_arb);
    root
}
