//! GLSL snippet assembly for the ballot-mask check.
//!
//! The body reads the 64-bit mask built-in and verifies, bit by bit, that it
//! matches the relational predicate against the invocation's own subgroup
//! index. The surrounding translation units are assembled in [`crate::program`].

use crate::mask::MaskType;
use crate::stage::{ShaderStage, StageSet};

/// Extensions every generated shader enables.
pub fn ext_header() -> String {
    "#extension GL_ARB_shader_ballot: enable\n\
     #extension GL_ARB_gpu_shader_int64: enable\n"
        .to_string()
}

/// The mask check. Declares `value` and `temp`, then stores `0xf` or `0x2`
/// into `tempRes`, which the enclosing stage template declares.
///
/// The mask is a 64-bit value, so subgroup sizes above 64 are outside what
/// this check can observe; that limitation is inherited from the built-ins
/// themselves.
pub fn body_source(mask_type: MaskType) -> String {
    let mut body = format!(
        "  uint64_t value = {};\n  bool temp = true;\n",
        mask_type.builtin_name()
    );

    match mask_type {
        MaskType::Eq => {
            body.push_str(
                "  uint64_t mask = uint64_t(1) << gl_SubGroupInvocationARB;\n\
                 \x20 temp = (value & mask) != 0;\n",
            );
        }
        MaskType::Ge | MaskType::Gt | MaskType::Le | MaskType::Lt => {
            // For each bit index the set predicate and its complement.
            let (set_op, clear_op) = match mask_type {
                MaskType::Ge => (">=", "<"),
                MaskType::Gt => (">", "<="),
                MaskType::Le => ("<=", ">"),
                MaskType::Lt => ("<", ">="),
                MaskType::Eq => unreachable!(),
            };
            body.push_str(&format!(
                "  for (uint i = 0; i < gl_SubGroupSizeARB; i++) {{\n\
                 \x20   uint64_t mask = uint64_t(1) << i;\n\
                 \x20   if (i {set_op} gl_SubGroupInvocationARB && (value & mask) == 0)\n\
                 \x20      temp = false;\n\
                 \x20   if (i {clear_op} gl_SubGroupInvocationARB && (value & mask) != 0)\n\
                 \x20      temp = false;\n\
                 \x20 }};\n"
            ));
        }
    }

    body.push_str("  uint tempResult = temp ? 0xf : 0x2;\n");
    body.push_str("  tempRes = tempResult;\n");
    body
}

/// Interface declarations for the standard (SSBO-reporting) variant: one
/// `std430` result buffer per active non-fragment stage, binding index
/// assigned by stage order, and a fragment output when the fragment stage
/// participates.
pub fn per_stage_head_declarations(stage_set: StageSet) -> Vec<String> {
    let stages = stage_set.active_stages();
    let mut declarations: Vec<String> = stages
        .iter()
        .filter(|stage| **stage != ShaderStage::Fragment)
        .enumerate()
        .map(|(binding, _)| {
            format!(
                "layout(set = 0, binding = {binding}, std430) buffer Buffer1\n\
                 {{\n\
                 \x20 uint result[];\n\
                 }};\n"
            )
        })
        .collect();

    if stage_set.includes_fragment() {
        declarations.push("layout(location = 0) out uint result;\n".to_string());
    }

    declarations
}

/// Interface declarations for the framebuffer (non-SSBO) variant. These are
/// positional, consumed by the framebuffer harness in stage order: vertex
/// output, geometry output, tessellation-evaluation output array, color
/// output.
pub fn framebuffer_head_declarations() -> Vec<String> {
    vec![
        "layout(location = 0) out float result;\n".to_string(),
        "layout(location = 0) out float out_color;\n".to_string(),
        "layout(location = 0) out float out_color[];\n".to_string(),
        "layout(location = 0) out float out_color;\n".to_string(),
    ]
}
