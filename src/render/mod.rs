pub mod pipeline;
pub mod surface;

pub use pipeline::{decode_frame, FramePipeline};
pub use surface::RasterSurface;
