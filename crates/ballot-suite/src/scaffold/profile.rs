//! Builds the [`DeviceProfile`] snapshot from a live physical device.

use crate::stage::ShaderStage;
use crate::support::{DeviceProfile, EXT_MESH_SHADER, EXT_SUBGROUP_SIZE_CONTROL, SubgroupSizeControl};
use anyhow::{Context, Result};
use ash::vk;
use std::collections::BTreeSet;

const STAGE_FLAGS: &[(vk::ShaderStageFlags, ShaderStage)] = &[
    (vk::ShaderStageFlags::VERTEX, ShaderStage::Vertex),
    (
        vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderStage::TessControl,
    ),
    (
        vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        ShaderStage::TessEval,
    ),
    (vk::ShaderStageFlags::GEOMETRY, ShaderStage::Geometry),
    (vk::ShaderStageFlags::FRAGMENT, ShaderStage::Fragment),
    (vk::ShaderStageFlags::COMPUTE, ShaderStage::Compute),
    (vk::ShaderStageFlags::MESH_EXT, ShaderStage::Mesh),
    (vk::ShaderStageFlags::TASK_EXT, ShaderStage::Task),
    (vk::ShaderStageFlags::RAYGEN_KHR, ShaderStage::RayGen),
    (vk::ShaderStageFlags::ANY_HIT_KHR, ShaderStage::AnyHit),
    (vk::ShaderStageFlags::CLOSEST_HIT_KHR, ShaderStage::ClosestHit),
    (vk::ShaderStageFlags::MISS_KHR, ShaderStage::Miss),
    (
        vk::ShaderStageFlags::INTERSECTION_KHR,
        ShaderStage::Intersection,
    ),
    (vk::ShaderStageFlags::CALLABLE_KHR, ShaderStage::Callable),
];

/// Expands a stage bitmask into the suite's stage list, in table order.
pub fn stages_from_flags(flags: vk::ShaderStageFlags) -> Vec<ShaderStage> {
    STAGE_FLAGS
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, stage)| *stage)
        .collect()
}

/// Queries every device fact the support checks read.
///
/// # Safety
///
/// `physical_device` must have been enumerated from `instance`, and the
/// instance must have been created for Vulkan 1.1 or later.
pub unsafe fn query_device_profile(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<DeviceProfile> {
    unsafe {
        let extensions: BTreeSet<String> = instance
            .enumerate_device_extension_properties(physical_device)
            .context("failed to enumerate device extensions")?
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let mut subgroup = vk::PhysicalDeviceSubgroupProperties::default();
        let mut size_control_properties = vk::PhysicalDeviceSubgroupSizeControlProperties::default();
        let mut properties2 = vk::PhysicalDeviceProperties2::default().push_next(&mut subgroup);
        if extensions.contains(EXT_SUBGROUP_SIZE_CONTROL) {
            properties2 = properties2.push_next(&mut size_control_properties);
        }
        instance.get_physical_device_properties2(physical_device, &mut properties2);
        let properties = properties2.properties;

        let mut size_control_features = vk::PhysicalDeviceSubgroupSizeControlFeatures::default();
        let mut mesh_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::default();
        if extensions.contains(EXT_SUBGROUP_SIZE_CONTROL) {
            features2 = features2.push_next(&mut size_control_features);
        }
        if extensions.contains(EXT_MESH_SHADER) {
            features2 = features2.push_next(&mut mesh_features);
        }
        instance.get_physical_device_features2(physical_device, &mut features2);
        let features = features2.features;

        let device_name = properties
            .device_name_as_c_str()
            .unwrap_or(c"unknown device")
            .to_string_lossy()
            .into_owned();

        Ok(DeviceProfile {
            device_name,
            subgroup_supported: properties.api_version >= vk::API_VERSION_1_1
                && subgroup
                    .supported_operations
                    .contains(vk::SubgroupFeatureFlags::BALLOT),
            subgroup_size: subgroup.subgroup_size,
            subgroup_stages: stages_from_flags(subgroup.supported_stages),
            extensions,
            shader_int64: features.shader_int64 == vk::TRUE,
            size_control: SubgroupSizeControl {
                subgroup_size_control: size_control_features.subgroup_size_control == vk::TRUE,
                compute_full_subgroups: size_control_features.compute_full_subgroups == vk::TRUE,
                min_subgroup_size: size_control_properties.min_subgroup_size,
                max_subgroup_size: size_control_properties.max_subgroup_size,
                required_size_stages: stages_from_flags(
                    size_control_properties.required_subgroup_size_stages,
                ),
            },
            mesh_shader: mesh_features.mesh_shader == vk::TRUE,
            task_shader: mesh_features.task_shader == vk::TRUE,
            vertex_pipeline_stores_and_atomics: features.vertex_pipeline_stores_and_atomics
                == vk::TRUE,
            tessellation_and_geometry_point_size: features
                .shader_tessellation_and_geometry_point_size
                == vk::TRUE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_flags_expand_in_table_order() {
        let stages = stages_from_flags(
            vk::ShaderStageFlags::COMPUTE
                | vk::ShaderStageFlags::VERTEX
                | vk::ShaderStageFlags::MESH_EXT,
        );
        assert_eq!(
            stages,
            vec![ShaderStage::Vertex, ShaderStage::Compute, ShaderStage::Mesh]
        );
    }

    #[test]
    fn all_graphics_flag_covers_the_graphics_stages() {
        let stages = stages_from_flags(vk::ShaderStageFlags::ALL_GRAPHICS);
        for stage in [
            ShaderStage::Vertex,
            ShaderStage::TessControl,
            ShaderStage::TessEval,
            ShaderStage::Geometry,
            ShaderStage::Fragment,
        ] {
            assert!(stages.contains(&stage));
        }
        assert!(!stages.contains(&ShaderStage::Compute));
    }
}
