use rgb::RGBA8;

use super::{palette, Canvas, ColorTable, Frame};

/// 合成器：把一帧的区域贴到画布上
#[derive(Debug)]
pub struct Compositor<'a> {
    /// 没有局部颜色表的帧使用
    global: Option<&'a ColorTable>,
    /// 已规整的位深
    depth: u8,
}

impl<'a> Compositor<'a> {
    pub fn new(global: Option<&'a ColorTable>, depth: u8) -> Compositor<'a> {
        Compositor {
            global,
            depth: palette::normalize_depth(depth),
        }
    }

    /// 局部颜色表优先，其次全局，都没有时用空表
    fn table_for<'f>(&'f self, frame: &'f Frame) -> &'f ColorTable {
        static EMPTY: ColorTable = ColorTable::EMPTY;
        frame
            .palette
            .as_ref()
            .or(self.global)
            .unwrap_or(&EMPTY)
    }

    /// 把 `frame` 合成到 `canvas` 的 `(left, top)` 处。
    ///
    /// 只写帧区域内的像素。声明了透明索引时，原始索引等于它的像素保留画布上的旧值。
    /// 写入的像素保留字节置为 0xFF。调用方保证帧区域在画布内（加载时已校验）。
    pub fn composite(&self, canvas: &mut Canvas, frame: &Frame) {
        let width = usize::from(frame.width);
        if width == 0 || frame.height == 0 {
            return;
        }
        debug_assert!(frame.right() <= canvas.width() && frame.bottom() <= canvas.height());

        let converted = palette::convert(&frame.indices, self.table_for(frame), self.depth);
        let keys: Vec<usize> = palette::indices(&frame.indices, self.depth).collect();
        let transparent = frame.transparent().map(usize::from);

        let rows = converted.chunks_exact(width).zip(keys.chunks_exact(width));
        for (y, (src, keys)) in rows.take(usize::from(frame.height)).enumerate() {
            let dst = canvas.row_mut(
                u32::from(frame.left),
                u32::from(frame.top) + y as u32,
                width,
            );
            for ((d, s), &key) in dst.iter_mut().zip(src).zip(keys) {
                if Some(key) == transparent {
                    continue;
                }
                *d = RGBA8 { a: 0xFF, ..*s };
            }
        }
    }
}
