use crate::session::ArgumentList;

/// Parameters for creating the GPU device and configuring the surface.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Swap behavior. FIFO is vsync-locked and always supported.
    pub present_mode: wgpu::PresentMode,

    /// Requested alpha mode; falls back to the first supported one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Latency hint; backends may ignore it.
    pub desired_maximum_frame_latency: u32,

    pub power_preference: wgpu::PowerPreference,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

impl GpuInit {
    /// Adjusts presentation for the session's launch flags.
    ///
    /// Benchmark runs present without vsync so frame rates are not capped by
    /// the display.
    pub fn for_args(args: &ArgumentList) -> Self {
        let mut init = Self::default();
        if args.is_benchmark() {
            init.present_mode = wgpu::PresentMode::AutoNoVsync;
            init.desired_maximum_frame_latency = 3;
        }
        init
    }
}
