//! Key decomposition.
//!
//! A key is split into 8 bytes, most significant first. The first 7 bytes
//! select a path of branch chunks and the last byte selects a slot in the
//! leaf chunk at the end of that path, so keys that only differ in their low
//! byte land in the same leaf chunk.

/// Number of bytes in a key, which is also the depth of the trie.
pub const KEY_BYTES: usize = 8;

/// Number of branch levels above the leaf level.
pub const BRANCH_LEVELS: usize = KEY_BYTES - 1;

/// Splits `key` into bytes `b0..b7`, `b0` being the most significant.
#[inline]
pub fn decompose(key: u64) -> [u8; KEY_BYTES] {
    key.to_be_bytes()
}

/// Inverse of [`decompose`].
#[inline]
pub fn compose(bytes: [u8; KEY_BYTES]) -> u64 {
    u64::from_be_bytes(bytes)
}

/// The 7-byte prefix `b0..b6` shared by every key in the same leaf chunk.
#[inline]
pub fn leaf_prefix(key: u64) -> u64 {
    key >> 8
}

/// The slot `b7` of `key` inside its leaf chunk.
#[inline]
pub fn leaf_offset(key: u64) -> u8 {
    key as u8
}

/// Maps a 2-D coordinate onto a key.
///
/// Byte `i` of the key holds nibble `i` (most significant first) of `x` in
/// its low half and nibble `i` of `y` in its high half. Every leaf chunk then
/// covers a 16x16 tile of the plane, and a new chunk is only reached when
/// either coordinate crosses a multiple of 16.
pub fn interleave(x: u32, y: u32) -> u64 {
    let mut bytes = [0u8; KEY_BYTES];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let shift = 28 - 4 * i as u32;
        let lx = ((x >> shift) & 0xF) as u8;
        let ly = ((y >> shift) & 0xF) as u8;
        *byte = lx | (ly << 4);
    }
    compose(bytes)
}

/// Inverse of [`interleave`].
pub fn deinterleave(key: u64) -> (u32, u32) {
    let mut x = 0u32;
    let mut y = 0u32;
    for byte in decompose(key) {
        x = (x << 4) | (byte & 0xF) as u32;
        y = (y << 4) | (byte >> 4) as u32;
    }
    (x, y)
}
