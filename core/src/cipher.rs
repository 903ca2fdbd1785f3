//! Fixed-key TEA obfuscation of request and response bodies.
//!
//! This is obfuscation shared with a known peer, not cryptography: the key
//! is a constant compiled into every client, and blocks are transformed
//! independently (ECB). Do not use it to protect secrets.
//!
//! Each full 8-byte block is transformed as two little-endian `u32` words
//! with 32 rounds of TEA. A trailing partial block is left as is, so the
//! output always has the input's length and `decode(encode(x)) == x` for
//! every byte sequence.

const DELTA: u32 = 0x9E37_79B9;
const ROUNDS: u32 = 32;
const BLOCK: usize = 8;

/// Key shared by every client in the process.
pub const SHARED_KEY: [u8; 16] = *b"httputils.tea.k1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeaCodec {
    key: [u32; 4],
}

impl Default for TeaCodec {
    fn default() -> Self {
        Self::with_key(SHARED_KEY)
    }
}

impl TeaCodec {
    pub fn with_key(key: [u8; 16]) -> Self {
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self { key: words }
    }

    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.encode_in_place(&mut out);
        out
    }

    pub fn decode(&self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.decode_in_place(&mut out);
        out
    }

    pub fn encode_in_place(&self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(BLOCK) {
            let mut v = read_block(block);
            encrypt_block(&mut v, &self.key);
            write_block(block, v);
        }
    }

    pub fn decode_in_place(&self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(BLOCK) {
            let mut v = read_block(block);
            decrypt_block(&mut v, &self.key);
            write_block(block, v);
        }
    }
}

fn read_block(block: &[u8]) -> [u32; 2] {
    [
        u32::from_le_bytes([block[0], block[1], block[2], block[3]]),
        u32::from_le_bytes([block[4], block[5], block[6], block[7]]),
    ]
}

fn write_block(block: &mut [u8], v: [u32; 2]) {
    block[..4].copy_from_slice(&v[0].to_le_bytes());
    block[4..].copy_from_slice(&v[1].to_le_bytes());
}

fn encrypt_block(v: &mut [u32; 2], k: &[u32; 4]) {
    let [mut v0, mut v1] = *v;
    let mut sum = 0u32;
    for _ in 0..ROUNDS {
        sum = sum.wrapping_add(DELTA);
        v0 = v0.wrapping_add(
            (v1 << 4).wrapping_add(k[0]) ^ v1.wrapping_add(sum) ^ (v1 >> 5).wrapping_add(k[1]),
        );
        v1 = v1.wrapping_add(
            (v0 << 4).wrapping_add(k[2]) ^ v0.wrapping_add(sum) ^ (v0 >> 5).wrapping_add(k[3]),
        );
    }
    *v = [v0, v1];
}

fn decrypt_block(v: &mut [u32; 2], k: &[u32; 4]) {
    let [mut v0, mut v1] = *v;
    let mut sum = DELTA.wrapping_mul(ROUNDS);
    for _ in 0..ROUNDS {
        v1 = v1.wrapping_sub(
            (v0 << 4).wrapping_add(k[2]) ^ v0.wrapping_add(sum) ^ (v0 >> 5).wrapping_add(k[3]),
        );
        v0 = v0.wrapping_sub(
            (v1 << 4).wrapping_add(k[0]) ^ v1.wrapping_add(sum) ^ (v1 >> 5).wrapping_add(k[1]),
        );
        sum = sum.wrapping_sub(DELTA);
    }
    *v = [v0, v1];
}
