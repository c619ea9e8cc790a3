//! Compute-kernel evaluator.
//!
//! The three packed arenas and their type-id lists are uploaded unchanged
//! as read-only storage buffers; camera and background scalars travel in a
//! small uniform block. One invocation runs per pixel and writes packed
//! RGBA8 into a storage buffer that is copied back after the dispatch.
//!
//! The kernel mirrors the host decode and shading step by step but draws
//! from its own random stream, so frames agree statistically, not bitwise.

use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};
use strahl_core::{Camera, ObjectStore, RecordKind, Scene};
use strahl_math::Vec3;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::{Background, RenderSettings};

/// Deepest recursion the kernel supports.
pub const MAX_DEVICE_DEPTH: u32 = 16;

const WORKGROUP_SIZE: u32 = 8;

/// Errors that can occur while setting up or running the kernel.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Kernel rejected by the device: {0}")]
    Pipeline(String),

    #[error("Failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("Readback channel closed before the dispatch finished")]
    ReadbackLost,

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("{what} of {requested} exceeds the device limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("Device rejected the dispatch: {0}")]
    Dispatch(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Uniform block matching `Params` in `trace.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DeviceParams {
    /// xyz position, w horizontal field of view (radians)
    pub position: [f32; 4],
    pub forward: [f32; 4],
    pub up: [f32; 4],
    pub right: [f32; 4],
    pub ambient: [f32; 4],
    /// w = 1 selects the gradient
    pub background_bottom: [f32; 4],
    pub background_top: [f32; 4],
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub max_depth: u32,
    pub material_count: u32,
    pub geometry_count: u32,
    pub light_count: u32,
    pub seed: u32,
}

impl DeviceParams {
    pub fn new(
        scene: &Scene,
        camera: &Camera,
        width: u32,
        height: u32,
        settings: &RenderSettings,
    ) -> Self {
        let v4 = |v: Vec3, w: f32| [v.x, v.y, v.z, w];
        let (bottom, top) = match settings.background {
            Background::Flat(color) => (v4(color, 0.0), v4(color, 0.0)),
            Background::Gradient { bottom, top } => (v4(bottom, 1.0), v4(top, 0.0)),
        };

        let max_depth = if settings.max_depth > MAX_DEVICE_DEPTH {
            log::warn!(
                "Device depth limited to {} (requested {})",
                MAX_DEVICE_DEPTH,
                settings.max_depth
            );
            MAX_DEVICE_DEPTH
        } else {
            settings.max_depth
        };

        Self {
            position: v4(camera.position(), camera.fov()),
            forward: v4(camera.forward(), 0.0),
            up: v4(camera.up(), 0.0),
            right: v4(camera.right(), 0.0),
            ambient: v4(camera.ambient_color(), 0.0),
            background_bottom: bottom,
            background_top: top,
            width,
            height,
            samples: camera.samples(),
            max_depth,
            material_count: scene.materials().len() as u32,
            geometry_count: scene.geometries().len() as u32,
            light_count: scene.lights().len() as u32,
            seed: (settings.seed ^ (settings.seed >> 32)) as u32,
        }
    }
}

/// wgpu device plus the compiled tracing pipeline.
pub struct DeviceRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl DeviceRenderer {
    /// Acquire a device and compile the kernel, blocking until done.
    pub fn new() -> DeviceResult<Self> {
        pollster::block_on(Self::new_async())
    }

    pub async fn new_async() -> DeviceResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(DeviceError::NoAdapter)?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Strahl Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trace Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/trace.wgsl").into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        entries.extend((1..=6).map(|binding| storage_entry(binding, true)));
        entries.push(storage_entry(7, false));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Trace Bind Group Layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Trace Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Trace Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = device.pop_error_scope().await {
            return Err(DeviceError::Pipeline(error.to_string()));
        }

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }

    /// Render `camera`'s view of `scene` into tightly packed RGBA8 `pixels`.
    pub fn render(
        &self,
        scene: &Scene,
        camera: &Camera,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        settings: &RenderSettings,
    ) -> DeviceResult<()> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DeviceError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        if expected == 0 {
            return Ok(());
        }

        let size = expected as wgpu::BufferAddress;
        let stores = [
            store_bytes(scene.materials()),
            store_bytes(scene.geometries()),
            store_bytes(scene.lights()),
        ];
        let mut bindings = vec![size];
        bindings.extend(stores.iter().flat_map(|&(data, types)| [data, types]));
        check_limits(&self.device.limits(), width, height, &bindings)?;

        // Anything the device rejects from here to submit must come back as
        // an error, not reach the uncaptured handler
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params = DeviceParams::new(scene, camera, width, height, settings);
        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Trace Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let (material_data, material_types) = self.upload_store("Material", scene.materials());
        let (geometry_data, geometry_types) = self.upload_store("Geometry", scene.geometries());
        let (light_data, light_types) = self.upload_store("Light", scene.lights());

        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trace Output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trace Readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let buffers = [
            &params_buffer,
            &material_data,
            &material_types,
            &geometry_data,
            &geometry_types,
            &light_data,
            &light_types,
            &output,
        ];
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Trace Bind Group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Trace Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Trace Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                width.div_ceil(WORKGROUP_SIZE),
                height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&output, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(DeviceError::Dispatch(error.to_string()));
        }

        // Blocking synchronization point
        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver.recv().map_err(|_| DeviceError::ReadbackLost)??;

        pixels.copy_from_slice(&slice.get_mapped_range());
        staging.unmap();

        log::debug!("Device dispatch of {}x{} finished", width, height);
        Ok(())
    }

    /// Upload a store's filled arena and its type ids.
    ///
    /// Storage bindings cannot be empty, so empty stores get one padding element.
    fn upload_store<K: RecordKind>(
        &self,
        family: &str,
        store: &ObjectStore<K>,
    ) -> (wgpu::Buffer, wgpu::Buffer) {
        let mut data = store.arena()[..store.filled()].to_vec();
        let mut types = store.type_ids().to_vec();
        if data.is_empty() {
            data.push(0.0);
        }
        if types.is_empty() {
            types.push(0);
        }

        let data_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Arena", family)),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let types_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Type Ids", family)),
                contents: bytemuck::cast_slice(&types),
                usage: wgpu::BufferUsages::STORAGE,
            });
        (data_buffer, types_buffer)
    }
}

/// Byte sizes of a store's filled arena and its type-id list.
fn store_bytes<K: RecordKind>(store: &ObjectStore<K>) -> (u64, u64) {
    let float = std::mem::size_of::<f32>() as u64;
    let id = std::mem::size_of::<u32>() as u64;
    (store.filled() as u64 * float, store.type_ids().len() as u64 * id)
}

/// Reject a frame whose dispatch or storage bindings the device cannot hold.
pub fn check_limits(
    limits: &wgpu::Limits,
    width: u32,
    height: u32,
    bindings: &[u64],
) -> DeviceResult<()> {
    let groups = width.div_ceil(WORKGROUP_SIZE).max(height.div_ceil(WORKGROUP_SIZE));
    if groups > limits.max_compute_workgroups_per_dimension {
        return Err(DeviceError::LimitExceeded {
            what: "Workgroup count",
            requested: groups as u64,
            limit: limits.max_compute_workgroups_per_dimension as u64,
        });
    }

    let binding_limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    if let Some(&largest) = bindings.iter().max() {
        if largest > binding_limit {
            return Err(DeviceError::LimitExceeded {
                what: "Storage binding size",
                requested: largest,
                limit: binding_limit,
            });
        }
    }
    Ok(())
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
