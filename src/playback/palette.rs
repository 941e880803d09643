use rgb::RGBA8;

use super::ColorTable;

/// 把位深规整到 8 的整数倍。
///
/// 解码库报告的位深可能是 6 这样的值，行跨度必须按整字节计算，所以 1-8 一律按 8 处理。
pub fn normalize_depth(bits: u8) -> u8 {
    if bits == 0 || bits % 8 != 0 {
        8
    } else {
        bits
    }
}

/// 每个索引像素占用的字节数
pub(super) fn bytes_per_index(bits: u8) -> usize {
    usize::from(normalize_depth(bits) / 8)
}

/// 按位深拆出每个像素的索引值（多字节按小端）
pub(super) fn indices(indexed: &[u8], bits: u8) -> impl Iterator<Item = usize> + '_ {
    indexed.chunks_exact(bytes_per_index(bits)).map(|chunk| {
        chunk
            .iter()
            .rev()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b))
    })
}

/// 调色板转真彩色。
///
/// 输出固定为 r, g, b 加一个保留字节（恒为 0，合成时再写）。超出颜色表的索引转成黑色。
pub fn convert(indexed: &[u8], table: &ColorTable, bits: u8) -> Vec<RGBA8> {
    indices(indexed, bits)
        .map(|index| {
            table
                .get(index)
                .map(|c| RGBA8::new(c.r, c.g, c.b, 0))
                .unwrap_or_default()
        })
        .collect()
}
