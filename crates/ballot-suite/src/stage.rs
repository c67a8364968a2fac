/// A single pipeline stage, as far as this suite needs to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
    Mesh,
    Task,
    RayGen,
    AnyHit,
    ClosestHit,
    Miss,
    Intersection,
    Callable,
}

impl ShaderStage {
    /// Short name used as a test-name suffix.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tess_control",
            ShaderStage::TessEval => "tess_eval",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
            ShaderStage::Mesh => "mesh",
            ShaderStage::Task => "task",
            ShaderStage::RayGen => "rgen",
            ShaderStage::AnyHit => "ahit",
            ShaderStage::ClosestHit => "chit",
            ShaderStage::Miss => "miss",
            ShaderStage::Intersection => "sect",
            ShaderStage::Callable => "call",
        }
    }
}

/// Mesh-shading stages a mesh case can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshStage {
    Mesh,
    Task,
}

impl MeshStage {
    pub const ALL: [MeshStage; 2] = [MeshStage::Mesh, MeshStage::Task];

    pub fn shader_stage(self) -> ShaderStage {
        match self {
            MeshStage::Mesh => ShaderStage::Mesh,
            MeshStage::Task => ShaderStage::Task,
        }
    }
}

/// Stages that can report through a rendered framebuffer instead of an SSBO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStage {
    Vertex,
    TessEval,
    TessControl,
    Geometry,
}

impl FramebufferStage {
    /// Registration order of the framebuffer cases.
    pub const ALL: [FramebufferStage; 4] = [
        FramebufferStage::Vertex,
        FramebufferStage::TessEval,
        FramebufferStage::TessControl,
        FramebufferStage::Geometry,
    ];

    pub fn shader_stage(self) -> ShaderStage {
        match self {
            FramebufferStage::Vertex => ShaderStage::Vertex,
            FramebufferStage::TessEval => ShaderStage::TessEval,
            FramebufferStage::TessControl => ShaderStage::TessControl,
            FramebufferStage::Geometry => ShaderStage::Geometry,
        }
    }
}

/// The stage class a case runs under. One variant per class keeps every
/// dispatch site an exhaustive match; compute and mesh cannot overlap by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageSet {
    Compute,
    Mesh(MeshStage),
    AllGraphics,
    AllRayTracing,
    Framebuffer(FramebufferStage),
}

const GRAPHICS_STAGES: [ShaderStage; 5] = [
    ShaderStage::Vertex,
    ShaderStage::TessControl,
    ShaderStage::TessEval,
    ShaderStage::Geometry,
    ShaderStage::Fragment,
];

const RAY_TRACING_STAGES: [ShaderStage; 6] = [
    ShaderStage::RayGen,
    ShaderStage::AnyHit,
    ShaderStage::ClosestHit,
    ShaderStage::Miss,
    ShaderStage::Intersection,
    ShaderStage::Callable,
];

impl StageSet {
    /// The stages whose shaders the source builder emits for this class, in
    /// binding order.
    pub fn active_stages(self) -> &'static [ShaderStage] {
        match self {
            StageSet::Compute => &[ShaderStage::Compute],
            StageSet::Mesh(MeshStage::Mesh) => &[ShaderStage::Mesh],
            // A task case still needs the mesh stage it launches.
            StageSet::Mesh(MeshStage::Task) => &[ShaderStage::Task, ShaderStage::Mesh],
            StageSet::AllGraphics => &GRAPHICS_STAGES,
            StageSet::AllRayTracing => &RAY_TRACING_STAGES,
            StageSet::Framebuffer(FramebufferStage::Vertex) => &[ShaderStage::Vertex],
            StageSet::Framebuffer(FramebufferStage::TessEval) => &[ShaderStage::TessEval],
            StageSet::Framebuffer(FramebufferStage::TessControl) => &[ShaderStage::TessControl],
            StageSet::Framebuffer(FramebufferStage::Geometry) => &[ShaderStage::Geometry],
        }
    }

    pub fn includes_fragment(self) -> bool {
        self.active_stages().contains(&ShaderStage::Fragment)
    }
}
