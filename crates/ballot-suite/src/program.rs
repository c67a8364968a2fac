//! Program generation. The suite hands the shared program builders a bundle
//! of snippets per case: extension header, mask-check body and per-stage
//! interface declarations. The compute translation unit is assembled here in
//! full because the bundled executor drives it itself; the multi-stage
//! pipeline builders consume the bundle as-is.

use crate::case::CaseDefinition;
use crate::glsl;
use crate::stage::StageSet;
use crate::support::SupportedCaps;

/// Workgroup width of the generated compute shader. Full-subgroup pipelines
/// require it to be a multiple of the requested subgroup size, so it must
/// stay a power of two at least as large as any size the sweep can request.
pub const COMPUTE_LOCAL_SIZE: u32 = 128;

/// Snippet bundle for one case, produced after the support check.
#[derive(Debug, Clone)]
pub struct ProgramInputs {
    pub stage_set: StageSet,
    pub ext_header: String,
    pub body: String,
    pub head_declarations: Vec<String>,
    pub point_size_supported: bool,
}

/// Standard (SSBO-reporting) variant.
pub fn build_programs(case: &CaseDefinition, caps: &SupportedCaps) -> ProgramInputs {
    ProgramInputs {
        stage_set: case.stage_set,
        ext_header: glsl::ext_header(),
        body: glsl::body_source(case.mask_type),
        head_declarations: glsl::per_stage_head_declarations(case.stage_set),
        point_size_supported: caps.point_size_supported,
    }
}

/// Framebuffer (non-SSBO) variant: same header and body, positional output
/// declarations instead of buffer bindings.
pub fn build_framebuffer_programs(case: &CaseDefinition, caps: &SupportedCaps) -> ProgramInputs {
    ProgramInputs {
        stage_set: case.stage_set,
        ext_header: glsl::ext_header(),
        body: glsl::body_source(case.mask_type),
        head_declarations: glsl::framebuffer_head_declarations(),
        point_size_supported: caps.point_size_supported,
    }
}

impl ProgramInputs {
    /// The complete compute translation unit. Every invocation stores its
    /// result word at its global invocation index.
    pub fn compute_shader_source(&self) -> String {
        let declaration = self
            .head_declarations
            .first()
            .map(String::as_str)
            .unwrap_or("");
        format!(
            "#version 450\n\
             {ext}\
             layout(local_size_x = {size}, local_size_y = 1, local_size_z = 1) in;\n\
             {declaration}\
             void main()\n\
             {{\n\
             \x20 uint tempRes;\n\
             {body}\
             \x20 result[gl_GlobalInvocationID.x] = tempRes;\n\
             }}\n",
            ext = self.ext_header,
            size = COMPUTE_LOCAL_SIZE,
            declaration = declaration,
            body = self.body,
        )
    }
}
