use rgb::RGB8;

/// 颜色表，全局或者单帧局部
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<RGB8>,
}

impl ColorTable {
    pub const EMPTY: ColorTable = ColorTable { colors: Vec::new() };

    pub fn new(colors: Vec<RGB8>) -> ColorTable {
        ColorTable { colors }
    }

    /// 解码库给出的 `r g b r g b ...` 紧凑字节
    pub fn from_packed(bytes: &[u8]) -> ColorTable {
        ColorTable {
            colors: bytes
                .chunks_exact(3)
                .map(|c| RGB8::new(c[0], c[1], c[2]))
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<RGB8> {
        self.colors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// 颜色表报告的位深，`2^depth >= len`
    pub fn bit_depth(&self) -> u8 {
        let mut depth = 1;
        while depth < 8 && (1usize << depth) < self.colors.len() {
            depth += 1;
        }
        depth
    }
}

/// 帧处理完后画布如何保留
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Disposal {
    /// 保持原样，下一帧在此基础上绘制
    #[default]
    Keep,
    /// 不向后延续
    Discard,
}

/// Graphic control 扩展块：标志字节、延时、透明索引
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphicControl {
    /// bit 0 透明可用，bit 2-4 处置方式
    pub flags: u8,
    /// 百分之一秒
    pub delay: u16,
    pub transparent_index: u8,
}

impl GraphicControl {
    /// 原始块：packed, delay 低字节, delay 高字节, 透明索引
    pub fn from_bytes(block: [u8; 4]) -> GraphicControl {
        GraphicControl {
            flags: block[0],
            delay: u16::from_le_bytes([block[1], block[2]]),
            transparent_index: block[3],
        }
    }

    pub fn transparent(&self) -> Option<u8> {
        (self.flags & 0x01 != 0).then_some(self.transparent_index)
    }

    pub fn disposal(&self) -> Disposal {
        match (self.flags >> 2) & 0x07 {
            2 | 3 => Disposal::Discard,
            _ => Disposal::Keep,
        }
    }
}

/// 解析后的一帧，加载后只读
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub left: u16,
    pub top: u16,
    /// 索引像素，每个像素一个字节
    pub indices: Vec<u8>,
    /// 局部颜色表，优先于全局颜色表
    pub palette: Option<ColorTable>,
    /// 没有 graphic control 块时为 `None`
    pub control: Option<GraphicControl>,
}

impl Frame {
    /// 整帧不透明、无扩展块
    pub fn new(left: u16, top: u16, width: u16, height: u16, indices: Vec<u8>) -> Frame {
        Frame {
            width,
            height,
            left,
            top,
            indices,
            palette: None,
            control: None,
        }
    }

    pub fn with_palette(mut self, palette: ColorTable) -> Frame {
        self.palette = Some(palette);
        self
    }

    pub fn with_control(mut self, control: GraphicControl) -> Frame {
        self.control = Some(control);
        self
    }

    /// 从解码库的帧转换过来
    pub fn from_decoded(frame: &gif::Frame<'_>) -> Frame {
        let mut flags = 0u8;
        if frame.transparent.is_some() {
            flags |= 0x01;
        }
        flags |= (frame.dispose as u8 & 0x07) << 2;
        // 解码库不区分“没有控制块”和“延时为 0”，统一视为没有时间信息
        let has_control = frame.delay != 0 || flags != 0;
        Frame {
            width: frame.width,
            height: frame.height,
            left: frame.left,
            top: frame.top,
            indices: frame.buffer.to_vec(),
            palette: frame.palette.as_deref().map(ColorTable::from_packed),
            control: has_control.then(|| {
                let [lo, hi] = frame.delay.to_le_bytes();
                GraphicControl::from_bytes([flags, lo, hi, frame.transparent.unwrap_or(0)])
            }),
        }
    }

    pub fn transparent(&self) -> Option<u8> {
        self.control.and_then(|c| c.transparent())
    }

    /// 延时（百分之一秒），0 视为未声明
    pub fn delay(&self) -> Option<u16> {
        self.control.map(|c| c.delay).filter(|&d| d > 0)
    }

    pub fn disposal(&self) -> Disposal {
        self.control.map(|c| c.disposal()).unwrap_or_default()
    }

    /// 帧区域右下角（不含）
    pub fn right(&self) -> u32 {
        u32::from(self.left) + u32::from(self.width)
    }

    pub fn bottom(&self) -> u32 {
        u32::from(self.top) + u32::from(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn control_block_decodes_little_endian_delay() {
        let control = GraphicControl::from_bytes([0x09, 0x14, 0x01, 7]);
        assert_eq!(control.delay, 0x0114);
        assert_eq!(control.transparent(), Some(7));
        assert_eq!(control.disposal(), Disposal::Discard);
    }

    #[test]
    fn transparency_requires_flag_bit() {
        let control = GraphicControl::from_bytes([0x04, 5, 0, 3]);
        assert_eq!(control.transparent(), None);
        assert_eq!(control.disposal(), Disposal::Keep);
    }

    #[test]
    fn zero_delay_counts_as_missing() {
        let frame = Frame::new(0, 0, 1, 1, vec![0]).with_control(GraphicControl::default());
        assert_eq!(frame.delay(), None);
        let frame = frame.with_control(GraphicControl {
            delay: 20,
            ..Default::default()
        });
        assert_eq!(frame.delay(), Some(20));
    }

    #[test]
    fn decoded_frame_packs_its_control_block() {
        let decoded = gif::Frame {
            left: 1,
            top: 2,
            width: 1,
            height: 1,
            delay: 0x0114,
            transparent: Some(7),
            dispose: gif::DisposalMethod::Background,
            buffer: Cow::Owned(vec![7]),
            ..gif::Frame::default()
        };
        let frame = Frame::from_decoded(&decoded);
        assert_eq!((frame.left, frame.top), (1, 2));
        assert_eq!(frame.delay(), Some(0x0114));
        assert_eq!(frame.transparent(), Some(7));
        assert_eq!(frame.disposal(), Disposal::Discard);

        let bare = gif::Frame {
            width: 1,
            height: 1,
            buffer: Cow::Owned(vec![0]),
            ..gif::Frame::default()
        };
        assert_eq!(Frame::from_decoded(&bare).control, None);
    }

    #[test]
    fn color_table_depth() {
        assert_eq!(ColorTable::from_packed(&[0; 6]).bit_depth(), 1);
        assert_eq!(ColorTable::from_packed(&[0; 3 * 5]).bit_depth(), 3);
        assert_eq!(ColorTable::from_packed(&[0; 3 * 256]).bit_depth(), 8);
    }
}
