use pd_types::{Error, Result, Var};

use crate::BitBuf;

/// Columnar storage of one test vector.
///
/// After `load`, bit `b` of `plane(v)` equals bit `v` of block `b`.
pub struct BlockBuffer {
    blocklen: usize,
    n_blocks: usize,
    planes: Vec<BitBuf>,
}

impl BlockBuffer {
    pub fn new(blocklen: usize) -> Self {
        assert!(blocklen > 0);
        BlockBuffer {
            blocklen,
            n_blocks: 0,
            planes: (0..blocklen).map(|_| BitBuf::zeroed(0)).collect(),
        }
    }

    #[inline]
    pub fn blocklen(&self) -> usize {
        self.blocklen
    }

    /// Number of whole blocks in the loaded chunk.
    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    #[inline]
    pub fn plane(&self, v: Var) -> &BitBuf {
        &self.planes[v as usize]
    }

    /// Packs `bytes` into bitplanes.
    ///
    /// Bit order is MSB-first: bit `8*i + j` of the stream is the `(7-j)`-th
    /// bit of byte `i`. Blocks are consecutive `blocklen`-bit windows;
    /// trailing bits that do not fill a whole block are discarded.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(Error::MalformedInput("empty chunk".into()));
        }
        let n_blocks = bytes.len() * 8 / self.blocklen;
        self.n_blocks = n_blocks;
        for p in &mut self.planes {
            p.reset(n_blocks);
        }
        for b in 0..n_blocks {
            let base = b * self.blocklen;
            for v in 0..self.blocklen {
                let g = base + v;
                if bytes[g >> 3] >> (7 - (g & 7)) & 1 == 1 {
                    self.planes[v].set(b);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_bit_order() {
        // 0x80 = bit 0 of the stream; 0x01 = bit 7.
        let mut buf = BlockBuffer::new(8);
        buf.load(&[0x80, 0x01]).unwrap();
        assert_eq!(buf.n_blocks(), 2);
        assert!(buf.plane(0).get(0));
        for v in 1..8 {
            assert!(!buf.plane(v).get(0));
        }
        assert!(buf.plane(7).get(1));
        for v in 0..7 {
            assert!(!buf.plane(v).get(1));
        }
    }

    #[test]
    fn blocks_span_bytes() {
        // blocklen 12: block 0 is byte 0 plus the high nibble of byte 1.
        let mut buf = BlockBuffer::new(12);
        buf.load(&[0x00, 0xF0, 0x00]).unwrap();
        assert_eq!(buf.n_blocks(), 2);
        for v in 0..12 {
            assert_eq!(buf.plane(v).get(0), v >= 8, "var {v}");
            assert!(!buf.plane(v).get(1));
        }
    }

    #[test]
    fn trailing_bits_discarded() {
        let mut buf = BlockBuffer::new(128);
        // 17 bytes = 136 bits = 1 block + 8 spare bits.
        buf.load(&[0xFF; 17]).unwrap();
        assert_eq!(buf.n_blocks(), 1);
        // Fewer bits than one block: zero blocks, not an error.
        buf.load(&[0xFF; 4]).unwrap();
        assert_eq!(buf.n_blocks(), 0);
    }

    #[test]
    fn empty_chunk_is_an_error() {
        let mut buf = BlockBuffer::new(8);
        assert!(buf.load(&[]).is_err());
    }

    #[test]
    fn planes_are_columns() {
        // Blocks of 4 bits: 0b1010 0b0110 -> plane 0 = [1,0], plane 1 = [0,1], ...
        let mut buf = BlockBuffer::new(4);
        buf.load(&[0b1010_0110]).unwrap();
        assert_eq!(buf.n_blocks(), 2);
        let expect = [[true, false], [false, true], [true, true], [false, false]];
        for (v, cols) in expect.iter().enumerate() {
            for (b, &bit) in cols.iter().enumerate() {
                assert_eq!(buf.plane(v as Var).get(b), bit, "var {v} block {b}");
            }
        }
    }
}
