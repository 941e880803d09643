mod canvas;
mod compositor;
mod frame;
mod frame_store;
mod handoff;
mod image;
pub mod palette;
mod static_image;

pub use canvas::{Canvas, Texture};
pub use compositor::Compositor;
pub use frame::{ColorTable, Disposal, Frame, GraphicControl};
pub use frame_store::FrameStore;
pub use handoff::Handoff;
pub use image::{AnimatedImage, Details, Image, ImageFormat};
pub use static_image::StaticImage;
