use png::{ColorType, Decoder, Transformations};
use rgb::{FromSlice, RGBA8};
use std::{
    fs::File,
    io::BufReader,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::debug;

use super::{Canvas, FrameStore, ImageFormat, Texture};
use crate::error::{Error, Result};

/// 静态图片：加载时一次性解码成纹理
#[derive(Debug)]
pub struct StaticImage {
    texture: Texture,
    ready: AtomicBool,
}

impl StaticImage {
    pub fn open(path: &Path) -> Result<StaticImage> {
        let texture = match ImageFormat::from_path(path) {
            Some(ImageFormat::Png) => decode_png(path)?,
            Some(ImageFormat::Gif) => decode_gif_first_frame(path)?,
            None => {
                return Err(Error::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        debug!(
            path = %path.display(),
            width = texture.width,
            height = texture.height,
            "loaded static image"
        );
        Ok(StaticImage::from_texture(texture))
    }

    pub fn from_texture(texture: Texture) -> StaticImage {
        StaticImage {
            texture,
            ready: AtomicBool::new(true),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.texture.width, self.texture.height)
    }

    /// 只在第一次取走之前为 `true`
    pub fn poll_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn consume(&self) -> Texture {
        self.ready.store(false, Ordering::Release);
        self.texture.clone()
    }
}

/// 解码 png，统一展开为 8 位 RGBA
fn decode_png(path: &Path) -> Result<Texture> {
    let file = File::open(path).map_err(|err| Error::open(path, err))?;
    let mut decoder = Decoder::new(BufReader::new(file));
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(|err| Error::open(path, err))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let output_info = reader
        .next_frame(&mut buf)
        .map_err(|err| Error::load(path, err.to_string()))?;
    let bytes = &buf[..output_info.buffer_size()];

    let pixels: Vec<RGBA8> = match output_info.color_type {
        ColorType::Rgba => bytes.as_rgba().to_vec(),
        ColorType::Rgb => bytes
            .as_rgb()
            .iter()
            .map(|p| RGBA8::new(p.r, p.g, p.b, 0xFF))
            .collect(),
        ColorType::GrayscaleAlpha => bytes
            .chunks_exact(2)
            .map(|p| RGBA8::new(p[0], p[0], p[0], p[1]))
            .collect(),
        ColorType::Grayscale => bytes.iter().map(|&v| RGBA8::new(v, v, v, 0xFF)).collect(),
        ColorType::Indexed => return Err(Error::load(path, "palette was not expanded")),
    };

    Ok(Texture {
        width: output_info.width,
        height: output_info.height,
        pixels,
    })
}

/// 单帧 GIF 走同一套合成，画在新画布上
fn decode_gif_first_frame(path: &Path) -> Result<Texture> {
    let store = FrameStore::load(path)?;
    let mut canvas = Canvas::new(u32::from(store.width()), u32::from(store.height()));
    if let Some(frame) = store.frame(0) {
        store.compositor().composite(&mut canvas, frame);
    }
    Ok(Texture::from_canvas(&canvas))
}
