/// One launchable sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub id: &'static str,
    pub category: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Cannot initialize until an image has been picked.
    pub requires_input: bool,
}

pub const SAMPLES: &[SampleInfo] = &[
    SampleInfo {
        id: "hello_triangle",
        category: "api",
        name: "Hello Triangle",
        description: "Smallest possible render loop",
        requires_input: false,
    },
    SampleInfo {
        id: "triangle_demo",
        category: "api",
        name: "Triangle Demo",
        description: "Animated triangle with a frame clock",
        requires_input: false,
    },
    SampleInfo {
        id: "gain_subpasses",
        category: "performance",
        name: "Subpasses",
        description: "Merging render passes on tiled GPUs",
        requires_input: false,
    },
    SampleInfo {
        id: "gain_input_attachment",
        category: "performance",
        name: "Input Attachments",
        description: "Reading the previous pass without a round trip to memory",
        requires_input: false,
    },
    SampleInfo {
        id: "gain_dynamic_uniform_buffer",
        category: "performance",
        name: "Dynamic Uniform Buffers",
        description: "Per-draw data through one buffer with dynamic offsets",
        requires_input: false,
    },
    SampleInfo {
        id: "camera_preview",
        category: "extensions",
        name: "Image Preview",
        description: "Renders an image picked by the user (drop a file on the window)",
        requires_input: true,
    },
];

pub fn find(id: &str) -> Option<&'static SampleInfo> {
    SAMPLES.iter().find(|s| s.id == id)
}
