use anyhow::{Context, Result, anyhow};

/// Compiles a generated GLSL compute shader to SPIR-V bytes.
pub fn compile_glsl_compute(source: &str) -> Result<Vec<u8>> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga::ShaderStage::Compute);
    let module = frontend.parse(&options, source).map_err(|errors| {
        anyhow!(
            "naga failed to parse generated GLSL:\n{}",
            errors.emit_to_string(source)
        )
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::default(),
        naga::valid::Capabilities::all(),
    );
    let info = validator.validate(&module).map_err(|err| {
        anyhow!(
            "naga validation failed:\n{}",
            err.emit_to_string(source)
        )
    })?;

    let words = naga::back::spv::write_vec(
        &module,
        &info,
        &naga::back::spv::Options::default(),
        None,
    )
    .context("naga failed to write SPIR-V")?;

    Ok(bytemuck::cast_slice(&words).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_plain_compute_shader() {
        let source = "#version 450\n\
            layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;\n\
            layout(set = 0, binding = 0, std430) buffer Buffer1\n\
            {\n\
            \x20 uint result[];\n\
            };\n\
            void main()\n\
            {\n\
            \x20 result[gl_GlobalInvocationID.x] = 0xf;\n\
            }\n";
        let spirv = compile_glsl_compute(source).unwrap();
        // SPIR-V magic number, little endian.
        assert_eq!(&spirv[..4], &0x0723_0203u32.to_le_bytes());
    }

    #[test]
    fn rejects_invalid_glsl() {
        assert!(compile_glsl_compute("#version 450\nvoid main() { nonsense; }").is_err());
    }
}
