//! Recording engine double for coordinator tests.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use crossbeam_channel::{Receiver, Sender};

use crate::imaging::PendingImage;

use super::args::ArgumentList;
use super::config::{AssetContext, SessionConfig};
use super::input::InputEvent;
use super::native::{NativeEngine, SurfaceSize};
use super::status::{ChannelReporter, Phase, StatusUpdate};

pub(crate) const RENDER_THREAD: &str = "lumen-test-render";
pub(crate) const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct TestSurface(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Bind(TestSurface, SurfaceSize),
    Unbind,
    Init(Vec<String>),
    Frame,
    Resize(SurfaceSize),
    Inject { width: u32, height: u32 },
    Input(InputEvent),
    Terminate,
}

#[derive(Default)]
struct Script {
    /// Fails the next `init` only.
    fail_init: Option<String>,
    /// Fails the n-th frame (1-based, counted across sessions).
    fail_frame: Option<u64>,
    /// Blocks inside the n-th frame until released.
    park_frame: Option<u64>,
    /// Panics inside `init`.
    panic_init: bool,
    /// Panics inside the n-th frame.
    panic_frame: Option<u64>,
}

/// Native engine that records every call with the calling thread's name.
pub(crate) struct RecordingEngine {
    calls: Arc<Mutex<Vec<(Call, String)>>>,
    script: Script,
    frames: u64,
    parked: Sender<()>,
    gate: Receiver<()>,
}

/// Test-side view of a [`RecordingEngine`].
pub(crate) struct Probe {
    calls: Arc<Mutex<Vec<(Call, String)>>>,
    parked: Receiver<()>,
    release: Sender<()>,
}

impl RecordingEngine {
    pub(crate) fn new() -> (Self, Probe) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (parked_tx, parked_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();

        let engine = Self {
            calls: Arc::clone(&calls),
            script: Script::default(),
            frames: 0,
            parked: parked_tx,
            gate: release_rx,
        };
        let probe = Probe {
            calls,
            parked: parked_rx,
            release: release_tx,
        };
        (engine, probe)
    }

    pub(crate) fn fail_init(mut self, reason: &str) -> Self {
        self.script.fail_init = Some(reason.to_string());
        self
    }

    pub(crate) fn fail_frame(mut self, n: u64) -> Self {
        self.script.fail_frame = Some(n);
        self
    }

    pub(crate) fn park_frame(mut self, n: u64) -> Self {
        self.script.park_frame = Some(n);
        self
    }

    pub(crate) fn panic_init(mut self) -> Self {
        self.script.panic_init = true;
        self
    }

    pub(crate) fn panic_frame(mut self, n: u64) -> Self {
        self.script.panic_frame = Some(n);
        self
    }

    fn record(&self, call: Call) {
        let thread = thread::current().name().unwrap_or("<unnamed>").to_string();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((call, thread));
    }
}

impl NativeEngine for RecordingEngine {
    type Surface = TestSurface;

    fn bind_surface(&mut self, surface: TestSurface, size: SurfaceSize) {
        self.record(Call::Bind(surface, size));
    }

    fn unbind_surface(&mut self) {
        self.record(Call::Unbind);
    }

    fn init(&mut self, _assets: &AssetContext, args: &ArgumentList) -> anyhow::Result<()> {
        self.record(Call::Init(args.iter().map(String::from).collect()));
        if std::mem::take(&mut self.script.panic_init) {
            panic!("native fault in init");
        }
        match self.script.fail_init.take() {
            Some(reason) => Err(anyhow!(reason)),
            None => Ok(()),
        }
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        self.frames += 1;
        self.record(Call::Frame);

        if self.script.park_frame == Some(self.frames) {
            let _ = self.parked.send(());
            let _ = self.gate.recv_timeout(TIMEOUT);
        }
        if self.script.panic_frame == Some(self.frames) {
            panic!("native fault at frame {}", self.frames);
        }
        if self.script.fail_frame == Some(self.frames) {
            return Err(anyhow!("device lost at frame {}", self.frames));
        }

        thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn surface_resized(&mut self, size: SurfaceSize) {
        self.record(Call::Resize(size));
    }

    fn inject_image(&mut self, image: PendingImage) {
        self.record(Call::Inject {
            width: image.width(),
            height: image.height(),
        });
    }

    fn input_event(&mut self, event: InputEvent) {
        self.record(Call::Input(event));
    }

    fn terminate(&mut self) {
        self.record(Call::Terminate);
    }
}

impl Probe {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.entries().into_iter().map(|(call, _)| call).collect()
    }

    pub(crate) fn entries(&self) -> Vec<(Call, String)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub(crate) fn frames(&self) -> usize {
        self.count(&Call::Frame)
    }

    pub(crate) fn count_inits(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Init(_)))
            .count()
    }

    pub(crate) fn wait_parked(&self) {
        self.parked
            .recv_timeout(TIMEOUT)
            .expect("engine never reached the parked frame");
    }

    pub(crate) fn release(&self) -> Sender<()> {
        self.release.clone()
    }
}

/// Collects status updates from a [`ChannelReporter`].
pub(crate) struct Statuses {
    rx: Receiver<StatusUpdate>,
    seen: Vec<StatusUpdate>,
}

impl Statuses {
    pub(crate) fn new() -> (Arc<ChannelReporter>, Self) {
        let (reporter, rx) = ChannelReporter::new();
        (
            Arc::new(reporter),
            Self {
                rx,
                seen: Vec::new(),
            },
        )
    }

    pub(crate) fn all(&mut self) -> &[StatusUpdate] {
        self.seen.extend(self.rx.try_iter());
        &self.seen
    }

    pub(crate) fn phases(&mut self) -> Vec<Phase> {
        self.all().iter().map(|u| u.phase).collect()
    }

    pub(crate) fn wait_for(&mut self, phase: Phase) -> StatusUpdate {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            if let Some(update) = self.all().iter().find(|u| u.phase == phase) {
                return update.clone();
            }
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(update) => self.seen.push(update),
                Err(_) => panic!("no {phase} status; saw {:?}", self.phases()),
            }
        }
    }
}

pub(crate) fn config(requires_input: bool) -> SessionConfig {
    SessionConfig {
        args: ArgumentList::new(vec!["sample".to_string(), "hello_triangle".to_string()]),
        requires_input,
        assets: AssetContext::under(std::env::temp_dir().join("lumen-test")),
        thread_name: RENDER_THREAD.to_string(),
    }
}

pub(crate) fn image(width: u32, height: u32) -> PendingImage {
    PendingImage::from_rgba8(width, height, vec![0x80; (width * height * 4) as usize])
        .expect("valid test image")
}

/// Polls `cond` until it holds or the test timeout passes.
pub(crate) fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}
