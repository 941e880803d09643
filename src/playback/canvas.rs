use png::Compression;
use rgb::{ComponentBytes, RGBA8};
use std::{fs::File, io::BufWriter, path::Path};

use crate::error::{Error, Result};

/// 持久画布，尺寸在创建后不再变化
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<RGBA8>,
}

impl Canvas {
    /// 全部像素为 0（包括保留字节），表示从未绘制
    pub fn new(width: u32, height: u32) -> Canvas {
        Canvas {
            width,
            height,
            pixels: vec![RGBA8::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[RGBA8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<RGBA8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.offset(x, y)).copied()
    }

    /// 一行中从 `x` 开始、长 `len` 的可写切片
    pub(crate) fn row_mut(&mut self, x: u32, y: u32, len: usize) -> &mut [RGBA8] {
        let start = self.offset(x, y);
        &mut self.pixels[start..start + len]
    }

    /// 复制另一块同尺寸画布的内容，不重新分配
    pub fn copy_from(&mut self, other: &Canvas) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.pixels.copy_from_slice(&other.pixels);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// 交给宿主渲染的像素数据
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGBA8>,
}

impl Texture {
    pub fn from_canvas(canvas: &Canvas) -> Texture {
        Texture {
            width: canvas.width,
            height: canvas.height,
            pixels: canvas.pixels.clone(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_bytes()
    }

    /// 保存为 8 位 RGBA png
    pub fn write_png(&self, path: &Path) -> Result<()> {
        let export = |source| Error::Export {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        let mut encoder = png::Encoder::new(&mut w, self.width, self.height);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(Compression::Fast);
        encoder.set_color(png::ColorType::Rgba);

        let mut writer = encoder.write_header().map_err(export)?;
        writer.write_image_data(self.as_bytes()).map_err(export)?;
        writer.finish().map_err(export)
    }
}
