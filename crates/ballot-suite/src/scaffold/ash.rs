//! Ash-based compute executor. Compiles the generated compute shader,
//! creates a one-buffer compute pipeline, dispatches a single workgroup and
//! reads the per-invocation result words back.
//!
//! Graphics, mesh, ray-tracing and framebuffer cases need full pipeline
//! runners, which belong to the surrounding conformance framework; this
//! executor reports them as not supported so the runner skips them.

use super::compile::compile_glsl_compute;
use super::profile::query_device_profile;
use crate::error::{CaseError, CaseResult};
use crate::program::{COMPUTE_LOCAL_SIZE, ProgramInputs};
use crate::run::SubgroupExecutor;
use crate::stage::{FramebufferStage, ShaderStage};
use crate::support::{DeviceProfile, EXT_SHADER_SUBGROUP_BALLOT, EXT_SUBGROUP_SIZE_CONTROL};
use anyhow::{Context, Result};
use ash::vk;
use gpu_alloc::{GpuAllocator, MemoryBlock, Request, UsageFlags};
use gpu_alloc_ash::AshMemoryDevice;
use std::ffi::{CStr, c_char};
use std::sync::Mutex;
use tracing::debug;

const ENTRY_POINT: &CStr = c"main";
const BALLOT_EXT_NAME: &CStr = c"VK_EXT_shader_subgroup_ballot";
const SIZE_CONTROL_EXT_NAME: &CStr = c"VK_EXT_subgroup_size_control";

pub struct AshComputeExecutor {
    instance: ash::Instance,
    device: ash::Device,
    queue: vk::Queue,
    memory_allocator: Mutex<GpuAllocator<vk::DeviceMemory>>,
    command_pool: vk::CommandPool,
    profile: DeviceProfile,
    _entry: ash::Entry,
}

struct ResultBuffer {
    buffer: vk::Buffer,
    block: MemoryBlock<vk::DeviceMemory>,
}

impl AshComputeExecutor {
    /// Creates an instance and device around the physical device at
    /// `device_index`, enabling the ballot and subgroup-size-control
    /// extensions when the device offers them.
    pub fn init(device_index: usize) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().context("failed to load Vulkan entry")?;

            let instance = entry
                .create_instance(
                    &vk::InstanceCreateInfo::default().application_info(
                        &vk::ApplicationInfo::default()
                            .application_name(c"ballot-suite")
                            .application_version(vk::make_api_version(0, 1, 0, 0))
                            .engine_name(c"ballot-suite")
                            .api_version(vk::API_VERSION_1_2),
                    ),
                    None,
                )
                .context("failed to create Vulkan instance")?;

            let physical_devices = instance
                .enumerate_physical_devices()
                .context("failed to enumerate physical devices")?;
            let physical_device = *physical_devices.get(device_index).with_context(|| {
                format!(
                    "device index {device_index} out of range ({} devices found)",
                    physical_devices.len()
                )
            })?;

            let profile = query_device_profile(&instance, physical_device)?;
            debug!(device = %profile.device_name, subgroup_size = profile.subgroup_size, "selected device");

            let queue_family_index = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .enumerate()
                .find(|(_, props)| props.queue_flags.contains(vk::QueueFlags::COMPUTE))
                .map(|(index, _)| index as u32)
                .context("no compute queue family found")?;

            let mut enabled_extensions: Vec<*const c_char> = Vec::new();
            if profile.has_extension(EXT_SHADER_SUBGROUP_BALLOT) {
                enabled_extensions.push(BALLOT_EXT_NAME.as_ptr());
            }
            let size_control_available = profile.has_extension(EXT_SUBGROUP_SIZE_CONTROL)
                && profile.size_control.subgroup_size_control;
            if size_control_available {
                enabled_extensions.push(SIZE_CONTROL_EXT_NAME.as_ptr());
            }

            let features =
                vk::PhysicalDeviceFeatures::default().shader_int64(profile.shader_int64);
            let mut size_control_features =
                vk::PhysicalDeviceSubgroupSizeControlFeatures::default()
                    .subgroup_size_control(true)
                    .compute_full_subgroups(profile.size_control.compute_full_subgroups);

            let queue_info = vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family_index)
                .queue_priorities(&[1.0]);
            let mut device_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(std::slice::from_ref(&queue_info))
                .enabled_extension_names(&enabled_extensions)
                .enabled_features(&features);
            if size_control_available {
                device_info = device_info.push_next(&mut size_control_features);
            }

            let device = instance
                .create_device(physical_device, &device_info, None)
                .context("failed to create Vulkan device")?;
            let queue = device.get_device_queue(queue_family_index, 0);

            let memory_allocator = Mutex::new(GpuAllocator::new(
                gpu_alloc::Config::i_am_potato(),
                gpu_alloc_ash::device_properties(&instance, vk::API_VERSION_1_2, physical_device)?,
            ));

            let command_pool = device
                .create_command_pool(
                    &vk::CommandPoolCreateInfo::default().queue_family_index(queue_family_index),
                    None,
                )
                .context("failed to create command pool")?;

            Ok(Self {
                instance,
                device,
                queue,
                memory_allocator,
                command_pool,
                profile,
                _entry: entry,
            })
        }
    }

    /// The capability snapshot taken during init.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    unsafe fn create_result_buffer(&self, size: u64) -> Result<ResultBuffer> {
        unsafe {
            let buffer = self
                .device
                .create_buffer(
                    &vk::BufferCreateInfo::default()
                        .size(size)
                        .usage(vk::BufferUsageFlags::STORAGE_BUFFER)
                        .sharing_mode(vk::SharingMode::EXCLUSIVE),
                    None,
                )
                .context("failed to create result buffer")?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let mut block = self.memory_allocator.lock().unwrap().alloc(
                AshMemoryDevice::wrap(&self.device),
                Request {
                    usage: UsageFlags::HOST_ACCESS,
                    align_mask: requirements.alignment,
                    size: requirements.size,
                    memory_types: requirements.memory_type_bits,
                },
            )?;

            // Results start zeroed so a shader that never stores fails.
            let zeroes = vec![0u8; size as usize];
            block.write_bytes(AshMemoryDevice::wrap(&self.device), 0, &zeroes)?;

            self.device
                .bind_buffer_memory(buffer, *block.memory(), 0)
                .context("failed to bind result buffer memory")?;

            Ok(ResultBuffer { buffer, block })
        }
    }

    unsafe fn destroy_result_buffer(&self, result: ResultBuffer) {
        unsafe {
            self.device.destroy_buffer(result.buffer, None);
            let mut allocator = self.memory_allocator.lock().unwrap();
            allocator.dealloc(AshMemoryDevice::wrap(&self.device), result.block);
        }
    }

    /// One workgroup of [`COMPUTE_LOCAL_SIZE`] invocations, reported back as
    /// one `u32` per invocation.
    unsafe fn dispatch_compute(
        &self,
        spirv_bytes: &[u8],
        required_subgroup_size: Option<u32>,
    ) -> Result<Vec<u32>> {
        unsafe {
            let invocations = COMPUTE_LOCAL_SIZE as u64;
            let buffer_size = invocations * std::mem::size_of::<u32>() as u64;

            let binding = vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::COMPUTE);
            let descriptor_set_layout = self
                .device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default()
                        .bindings(std::slice::from_ref(&binding)),
                    None,
                )
                .context("failed to create descriptor set layout")?;

            let pipeline_layout = self
                .device
                .create_pipeline_layout(
                    &vk::PipelineLayoutCreateInfo::default()
                        .set_layouts(std::slice::from_ref(&descriptor_set_layout)),
                    None,
                )
                .context("failed to create pipeline layout")?;

            let spirv_words: Vec<u32> = spirv_bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            let shader_module = self
                .device
                .create_shader_module(
                    &vk::ShaderModuleCreateInfo::default().code(&spirv_words),
                    None,
                )
                .context("failed to create shader module")?;

            let mut stage_info = vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::COMPUTE)
                .module(shader_module)
                .name(ENTRY_POINT);
            let mut size_info = vk::PipelineShaderStageRequiredSubgroupSizeCreateInfo::default();
            if let Some(size) = required_subgroup_size {
                // Full subgroups need the workgroup width to be a multiple
                // of the requested size; COMPUTE_LOCAL_SIZE guarantees that
                // for every power of two the sweep produces.
                size_info = size_info.required_subgroup_size(size);
                stage_info = stage_info
                    .flags(vk::PipelineShaderStageCreateFlags::REQUIRE_FULL_SUBGROUPS)
                    .push_next(&mut size_info);
            }

            let pipeline = self
                .device
                .create_compute_pipelines(
                    vk::PipelineCache::null(),
                    &[vk::ComputePipelineCreateInfo::default()
                        .stage(stage_info)
                        .layout(pipeline_layout)],
                    None,
                )
                .map_err(|(_, e)| e)
                .context("failed to create compute pipeline")?[0];
            self.device.destroy_shader_module(shader_module, None);

            let result_buffer = self.create_result_buffer(buffer_size)?;

            let pool_size = vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 1,
            };
            let descriptor_pool = self
                .device
                .create_descriptor_pool(
                    &vk::DescriptorPoolCreateInfo::default()
                        .pool_sizes(std::slice::from_ref(&pool_size))
                        .max_sets(1),
                    None,
                )
                .context("failed to create descriptor pool")?;
            let descriptor_set = self
                .device
                .allocate_descriptor_sets(
                    &vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(descriptor_pool)
                        .set_layouts(std::slice::from_ref(&descriptor_set_layout)),
                )
                .context("failed to allocate descriptor set")?[0];

            let buffer_info = vk::DescriptorBufferInfo::default()
                .buffer(result_buffer.buffer)
                .offset(0)
                .range(vk::WHOLE_SIZE);
            let write = vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1)
                .buffer_info(std::slice::from_ref(&buffer_info));
            self.device
                .update_descriptor_sets(std::slice::from_ref(&write), &[]);

            let command_buffer = self
                .device
                .allocate_command_buffers(
                    &vk::CommandBufferAllocateInfo::default()
                        .command_pool(self.command_pool)
                        .level(vk::CommandBufferLevel::PRIMARY)
                        .command_buffer_count(1),
                )
                .context("failed to allocate command buffer")?[0];

            self.device
                .begin_command_buffer(
                    command_buffer,
                    &vk::CommandBufferBeginInfo::default()
                        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
                )
                .context("failed to begin command buffer")?;
            self.device
                .cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::COMPUTE, pipeline);
            self.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline_layout,
                0,
                &[descriptor_set],
                &[],
            );
            self.device.cmd_dispatch(command_buffer, 1, 1, 1);
            self.device
                .end_command_buffer(command_buffer)
                .context("failed to end command buffer")?;

            self.device
                .queue_submit(
                    self.queue,
                    &[vk::SubmitInfo::default()
                        .command_buffers(std::slice::from_ref(&command_buffer))],
                    vk::Fence::null(),
                )
                .context("failed to submit command buffer")?;
            self.device
                .queue_wait_idle(self.queue)
                .context("failed to wait for queue idle")?;

            let mut bytes = vec![0u8; buffer_size as usize];
            let mut result_buffer = result_buffer;
            result_buffer
                .block
                .read_bytes(AshMemoryDevice::wrap(&self.device), 0, &mut bytes)?;
            let results: Vec<u32> = bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();

            self.device
                .free_command_buffers(self.command_pool, &[command_buffer]);
            self.device.destroy_descriptor_pool(descriptor_pool, None);
            self.destroy_result_buffer(result_buffer);
            self.device.destroy_pipeline(pipeline, None);
            self.device.destroy_pipeline_layout(pipeline_layout, None);
            self.device
                .destroy_descriptor_set_layout(descriptor_set_layout, None);

            Ok(results)
        }
    }
}

impl SubgroupExecutor for AshComputeExecutor {
    fn run_compute(
        &self,
        programs: &ProgramInputs,
        required_subgroup_size: Option<u32>,
    ) -> CaseResult<Vec<u32>> {
        let source = programs.compute_shader_source();
        debug!(?required_subgroup_size, "compiling generated compute shader");
        let spirv = compile_glsl_compute(&source)?;
        let results = unsafe { self.dispatch_compute(&spirv, required_subgroup_size) }?;
        Ok(results)
    }

    fn run_mesh(
        &self,
        _programs: &ProgramInputs,
        _required_subgroup_size: Option<u32>,
    ) -> CaseResult<Vec<u32>> {
        Err(CaseError::NotSupported(
            "mesh pipeline runner is not available in this executor".to_string(),
        ))
    }

    fn run_graphics(
        &self,
        _programs: &ProgramInputs,
        _stages: &[ShaderStage],
    ) -> CaseResult<Vec<u32>> {
        Err(CaseError::NotSupported(
            "graphics pipeline runner is not available in this executor".to_string(),
        ))
    }

    fn run_ray_tracing(
        &self,
        _programs: &ProgramInputs,
        _stages: &[ShaderStage],
    ) -> CaseResult<Vec<u32>> {
        Err(CaseError::NotSupported(
            "ray-tracing pipeline runner is not available in this executor".to_string(),
        ))
    }

    fn run_framebuffer(
        &self,
        _programs: &ProgramInputs,
        _stage: FramebufferStage,
    ) -> CaseResult<Vec<u32>> {
        Err(CaseError::NotSupported(
            "framebuffer pipeline runner is not available in this executor".to_string(),
        ))
    }
}

impl Drop for AshComputeExecutor {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
