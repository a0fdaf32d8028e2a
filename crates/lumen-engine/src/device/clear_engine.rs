use anyhow::{bail, Context, Result};

use crate::imaging::PendingImage;
use crate::session::{ArgumentList, AssetContext, InputEvent, NativeEngine, SurfaceSize};
use crate::time::{FrameClock, FrameStats};

use super::gpu::Gpu;
use super::surface::{SurfaceErrorAction, WindowSurface};
use super::GpuInit;

/// Base colors (linear RGB) of the bundled samples.
const PALETTE: &[(&str, [f64; 3])] = &[
    ("hello_triangle", [0.80, 0.20, 0.15]),
    ("triangle_demo", [0.15, 0.55, 0.25]),
    ("gain_subpasses", [0.20, 0.30, 0.80]),
    ("gain_input_attachment", [0.55, 0.20, 0.65]),
    ("gain_dynamic_uniform_buffer", [0.85, 0.60, 0.10]),
    ("camera_preview", [0.10, 0.10, 0.12]),
];

const FALLBACK: [f64; 3] = [0.02, 0.02, 0.03];

/// Base clear color for a sample id.
///
/// Unknown ids get a stable color derived from the id so every sample is
/// visually distinct.
pub fn palette_for(sample: Option<&str>) -> [f64; 3] {
    let Some(id) = sample else {
        return FALLBACK;
    };

    if let Some((_, color)) = PALETTE.iter().find(|(name, _)| *name == id) {
        return *color;
    }

    // FNV-1a; any stable hash works here.
    let hash = id.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    [0, 16, 32].map(|shift| 0.15 + f64::from(((hash >> shift) & 0xff) as u8) / 255.0 * 0.7)
}

fn srgb_to_linear(c: u8) -> f64 {
    (f64::from(c) / 255.0).powf(2.2)
}

/// Minimal wgpu-backed engine: clears the surface every frame with the
/// sample's color, pulsing over time and tinted by the last injected image.
/// Holding a press (primary button or touch) brightens it.
pub struct ClearEngine {
    surface: Option<WindowSurface>,
    size: SurfaceSize,
    gpu: Option<Gpu>,
    clock: FrameClock,
    stats: FrameStats,
    base: [f64; 3],
    tint: Option<[f64; 3]>,
    pressed: bool,
    benchmark: bool,
}

impl ClearEngine {
    pub fn new() -> Self {
        Self {
            surface: None,
            size: SurfaceSize::new(0, 0),
            gpu: None,
            clock: FrameClock::new(),
            stats: FrameStats::default(),
            base: FALLBACK,
            tint: None,
            pressed: false,
            benchmark: false,
        }
    }

    fn clear_color(&self, elapsed: f32) -> wgpu::Color {
        let pulse = 0.85 + 0.15 * f64::from(elapsed * 2.0).sin();
        let mut rgb = self.base.map(|c| c * pulse);
        if let Some(tint) = self.tint {
            for (c, t) in rgb.iter_mut().zip(tint) {
                *c = (*c + t) * 0.5;
            }
        }
        if self.pressed {
            rgb = rgb.map(|c| (c * 1.5).min(1.0));
        }
        wgpu::Color {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }
}

impl Default for ClearEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine for ClearEngine {
    type Surface = WindowSurface;

    fn bind_surface(&mut self, surface: WindowSurface, size: SurfaceSize) {
        log::debug!("binding {surface:?} at {size}");
        self.surface = Some(surface);
        self.size = size;
    }

    fn unbind_surface(&mut self) {
        self.surface = None;
    }

    fn init(&mut self, assets: &AssetContext, args: &ArgumentList) -> Result<()> {
        if !assets.asset_root.is_dir() {
            log::warn!("asset root `{}` does not exist", assets.asset_root.display());
        }
        for dir in [&assets.storage_dir, &assets.temp_dir] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("cannot create `{}`: {e}", dir.display());
            }
        }

        let surface = self
            .surface
            .take()
            .context("init called without a bound surface")?;
        let gpu = pollster::block_on(Gpu::new(surface, self.size, &GpuInit::for_args(args)))?;

        self.gpu = Some(gpu);
        self.base = palette_for(args.sample_id());
        self.benchmark = args.is_benchmark();
        self.clock.reset();
        self.stats = FrameStats::default();

        log::info!("`{}` ready", args.sample_id().unwrap_or(args.command()));
        Ok(())
    }

    fn render_frame(&mut self) -> Result<()> {
        let time = self.clock.tick();
        let color = self.clear_color(time.elapsed);
        let gpu = self.gpu.as_ref().context("render_frame before init")?;

        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let reason = err.to_string();
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        log::debug!("frame {} skipped: {reason}", time.frame_index);
                        Ok(())
                    }
                    SurfaceErrorAction::Fatal => bail!("surface lost for good: {reason}"),
                };
            }
        };

        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        gpu.submit(frame);

        if let Some(fps) = self.stats.record() {
            if self.benchmark {
                log::info!("{fps:.1} fps");
            } else {
                log::trace!("{fps:.1} fps");
            }
        }
        Ok(())
    }

    fn surface_resized(&mut self, size: SurfaceSize) {
        self.size = size;
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(size);
        }
    }

    fn input_event(&mut self, event: InputEvent) {
        if event.is_press() {
            self.pressed = true;
        } else if event.is_release() {
            self.pressed = false;
        }
    }

    fn inject_image(&mut self, image: PendingImage) {
        let [r, g, b, _] = image.mean_color();
        self.tint = Some([r, g, b].map(srgb_to_linear));
        log::debug!("tint from {image:?}");
    }

    fn terminate(&mut self) {
        if self.gpu.take().is_some() {
            log::debug!("gpu released");
        }
        self.tint = None;
        self.pressed = false;
        self.clock.reset();
    }
}
