//! Packed-bit buffers and the columnar block storage they back.
//!
//! A test vector of `N` blocks of `blocklen` bits is stored as `blocklen`
//! bitplanes of `N` bits each, so evaluating a monomial over all blocks is a
//! word-wise AND of its planes followed by a popcount.

mod bitbuf;
mod buffer;

pub use bitbuf::BitBuf;
pub use buffer::BlockBuffer;
