use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{debug, warn};

use super::{palette, ColorTable, Compositor, Frame};
use crate::error::{Error, Result};

/// 解析后的 GIF 容器：画布尺寸、全局颜色表、所有帧。加载后只读。
#[derive(Clone, Debug)]
pub struct FrameStore {
    width: u16,
    height: u16,
    global: Option<ColorTable>,
    /// 已规整为 8 的倍数
    depth: u8,
    frames: Vec<Frame>,
}

impl FrameStore {
    /// 校验并组装。
    ///
    /// 帧区域必须完全落在画布内，索引数据长度必须等于 `width * height`，至少要有一帧。
    pub fn new(
        width: u16,
        height: u16,
        global: Option<ColorTable>,
        frames: Vec<Frame>,
    ) -> std::result::Result<FrameStore, String> {
        // 没有全局颜色表时按 8 位处理
        let depth = palette::normalize_depth(global.as_ref().map_or(8, ColorTable::bit_depth));

        if frames.is_empty() {
            return Err("container has no frames".to_string());
        }
        for (i, frame) in frames.iter().enumerate() {
            if frame.right() > u32::from(width) || frame.bottom() > u32::from(height) {
                return Err(format!(
                    "frame {i} region {}x{}+{}+{} exceeds canvas {width}x{height}",
                    frame.width, frame.height, frame.left, frame.top
                ));
            }
            let expected = usize::from(frame.width)
                * usize::from(frame.height)
                * palette::bytes_per_index(depth);
            if frame.indices.len() != expected {
                return Err(format!(
                    "frame {i} has {} pixel bytes, expected {expected}",
                    frame.indices.len()
                ));
            }
        }

        Ok(FrameStore {
            width,
            height,
            global,
            depth,
            frames,
        })
    }

    /// 打开并完整解析，不做单帧判断
    pub fn load(path: &Path) -> Result<FrameStore> {
        let file = File::open(path).map_err(|err| Error::open(path, err))?;
        FrameStore::read(BufReader::new(file), path)
    }

    /// 打开动画容器。
    ///
    /// 只有一帧时返回 [`Error::SingleFrameHint`]，调用方应改用静态图片路径。
    #[tracing::instrument]
    pub fn open(path: &Path) -> Result<FrameStore> {
        let store = FrameStore::load(path)?;
        if store.frame_count() == 1 {
            debug!("single frame container, redirecting to static path");
            return Err(Error::SingleFrameHint {
                path: path.to_path_buf(),
            });
        }
        debug!(
            width = store.width,
            height = store.height,
            frames = store.frame_count(),
            "loaded animated container"
        );
        Ok(store)
    }

    /// 从任意数据源解析，`path` 只用于报错
    pub fn read<R: Read>(reader: R, path: &Path) -> Result<FrameStore> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);

        // 头部读不出来说明不是 GIF
        let mut decoder = options
            .read_info(reader)
            .map_err(|err| Error::open(path, err))?;

        let width = decoder.width();
        let height = decoder.height();
        let global = decoder.global_palette().map(ColorTable::from_packed);
        if global.is_none() {
            warn!(path = %path.display(), "no global color table, assuming 8 bit depth");
        }

        let mut frames = vec![];
        loop {
            match decoder.read_next_frame() {
                Ok(Some(frame)) => frames.push(Frame::from_decoded(frame)),
                Ok(None) => break,
                Err(err) => return Err(Error::load(path, err.to_string())),
            }
        }

        FrameStore::new(width, height, global, frames).map_err(|reason| Error::load(path, reason))
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn global(&self) -> Option<&ColorTable> {
        self.global.as_ref()
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn compositor(&self) -> Compositor<'_> {
        Compositor::new(self.global(), self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn encode(width: u16, height: u16, frames: &[(u16, u16, u16, u16, u8)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let palette = [255, 0, 0, 0, 0, 255];
            let mut encoder = gif::Encoder::new(&mut buf, width, height, &palette).unwrap();
            for &(left, top, w, h, index) in frames {
                let frame = gif::Frame {
                    left,
                    top,
                    width: w,
                    height: h,
                    delay: 10,
                    buffer: Cow::Owned(vec![index; usize::from(w) * usize::from(h)]),
                    ..gif::Frame::default()
                };
                encoder.write_frame(&frame).unwrap();
            }
        }
        buf
    }

    #[test]
    fn reads_frames_and_global_table() {
        let bytes = encode(4, 4, &[(0, 0, 4, 4, 0), (1, 1, 2, 2, 1)]);
        let store = FrameStore::read(&bytes[..], Path::new("mem.gif")).unwrap();
        assert_eq!((store.width(), store.height()), (4, 4));
        assert_eq!(store.frame_count(), 2);
        assert_eq!(store.depth(), 8);
        assert_eq!(store.global().map(ColorTable::len), Some(2));

        let second = store.frame(1).unwrap();
        assert_eq!((second.left, second.top, second.width, second.height), (1, 1, 2, 2));
        assert_eq!(second.indices, vec![1; 4]);
        assert_eq!(second.delay(), Some(10));
    }

    #[test]
    fn garbage_is_an_open_failure() {
        let err = FrameStore::read(&b"not a gif at all"[..], Path::new("x.gif")).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn truncated_payload_is_a_load_failure() {
        let bytes = encode(4, 4, &[(0, 0, 4, 4, 0), (0, 0, 4, 4, 1)]);
        let cut = &bytes[..bytes.len() - 8];
        let err = FrameStore::read(cut, Path::new("cut.gif")).unwrap_err();
        assert!(matches!(err, Error::Load { .. }), "{err}");
    }

    #[test]
    fn missing_file_is_an_open_failure() {
        let err = FrameStore::load(Path::new("/definitely/not/here.gif")).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn region_outside_canvas_is_rejected() {
        let frames = vec![Frame::new(3, 3, 2, 2, vec![0; 4])];
        let err = FrameStore::new(4, 4, None, frames).unwrap_err();
        assert!(err.contains("exceeds canvas"));
    }

    #[test]
    fn short_pixel_data_is_rejected() {
        let frames = vec![Frame::new(0, 0, 2, 2, vec![0; 3])];
        assert!(FrameStore::new(4, 4, None, frames).is_err());
    }

    #[test]
    fn empty_container_is_rejected() {
        assert!(FrameStore::new(4, 4, None, vec![]).is_err());
    }

    #[test]
    fn odd_global_depth_normalizes_to_eight() {
        // 5 种颜色报告为 3 位
        let global = ColorTable::from_packed(&[0; 15]);
        let frames = vec![Frame::new(0, 0, 1, 1, vec![0])];
        let store = FrameStore::new(1, 1, Some(global), frames).unwrap();
        assert_eq!(store.depth(), 8);
    }
}
