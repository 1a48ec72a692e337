//! Derivation of the per-key cipher state.
//!
//! Both derivations are fixed obfuscation algorithms and must stay bit-exact with files
//! found in the wild, so every step below is order sensitive.

use std::fmt;

/// Size of every [`MaskSet`] lane array.
pub const MASK_SIZE: usize = 0x20;

/// Video and audio masks derived from a 64-bit key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MaskSet {
    pub video1: [u8; MASK_SIZE],
    pub video2: [u8; MASK_SIZE],
    /// Derived for completeness, nothing applies it.
    pub audio: [u8; MASK_SIZE],
}

impl MaskSet {
    pub fn new(key: u64) -> Self {
        let k = key.to_le_bytes();
        let mut m = [0u8; MASK_SIZE];

        m[0x00] = k[0];
        m[0x01] = k[1];
        m[0x02] = k[2];
        m[0x03] = k[3].wrapping_sub(0x34);
        m[0x04] = k[4].wrapping_add(0xF9);
        m[0x05] = k[5] ^ 0x13;
        m[0x06] = k[6].wrapping_add(0x61);
        m[0x07] = !m[0x00];
        m[0x08] = m[0x02].wrapping_add(m[0x01]);
        m[0x09] = m[0x01].wrapping_sub(m[0x07]);
        m[0x0A] = !m[0x02];
        m[0x0B] = !m[0x01];
        m[0x0C] = m[0x0B].wrapping_add(m[0x09]);
        m[0x0D] = m[0x08].wrapping_sub(m[0x03]);
        m[0x0E] = !m[0x0D];
        m[0x0F] = m[0x0A].wrapping_sub(m[0x0B]);
        m[0x10] = m[0x08].wrapping_sub(m[0x0F]);
        m[0x11] = m[0x10] ^ m[0x07];
        m[0x12] = !m[0x0F];
        m[0x13] = m[0x03] ^ 0x10;
        m[0x14] = m[0x04].wrapping_sub(0x32);
        m[0x15] = m[0x05].wrapping_add(0xED);
        m[0x16] = m[0x06] ^ 0xF3;
        m[0x17] = m[0x13].wrapping_sub(m[0x0F]);
        m[0x18] = m[0x15].wrapping_add(m[0x07]);
        m[0x19] = 0x21u8.wrapping_sub(m[0x13]);
        m[0x1A] = m[0x14] ^ m[0x17];
        m[0x1B] = m[0x16] << 1;
        m[0x1C] = m[0x17].wrapping_add(0x44);
        m[0x1D] = m[0x03].wrapping_add(m[0x04]);
        m[0x1E] = m[0x05].wrapping_sub(m[0x16]);
        m[0x1F] = m[0x1D] ^ m[0x13];

        let video2 = m.map(|x| !x);
        let mut audio = video2;

        for (i, x) in audio.iter_mut().enumerate().skip(1).step_by(2) {
            *x = b"URUC"[(i >> 1) & 3];
        }

        Self {
            video1: m,
            video2,
            audio,
        }
    }
}

impl fmt::Debug for MaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskSet")
            .field("video1", &hex::encode(self.video1))
            .field("video2", &hex::encode(self.video2))
            .field("audio", &hex::encode(self.audio))
            .finish()
    }
}

/// A byte to byte permutation used to decrypt audio blocks.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubstitutionTable(pub [u8; 0x100]);

impl SubstitutionTable {
    /// Table for cipher type 0.
    pub const IDENTITY: Self = Self(identity_table());
    /// Table for cipher type 1, shared by every key.
    pub const FIXED: Self = Self(fixed_table());

    /// Table for cipher type 56.
    pub fn new(key: u64) -> Self {
        let t1 = key.wrapping_sub(1).to_le_bytes();
        let t2 = [
            t1[1],
            t1[1] ^ t1[6],
            t1[2] ^ t1[3],
            t1[2],
            t1[2] ^ t1[1],
            t1[3] ^ t1[4],
            t1[3],
            t1[3] ^ t1[2],
            t1[4] ^ t1[5],
            t1[4],
            t1[4] ^ t1[3],
            t1[5] ^ t1[6],
            t1[5],
            t1[5] ^ t1[4],
            t1[6] ^ t1[1],
            t1[6],
        ];

        let t31 = nibble_table(t1[0]);
        let mut t3 = [0u8; 0x100];

        for (i, seed) in t2.into_iter().enumerate() {
            let t32 = nibble_table(seed);
            let high = t31[i] << 4;

            for (j, low) in t32.into_iter().enumerate() {
                t3[i * 0x10 + j] = high | low;
            }
        }

        let mut table = [0u8; 0x100];
        let mut cursor = 0usize;
        let mut index = 1;

        for _ in 0..0x100 {
            cursor = (cursor + 0x11) & 0xFF;
            let x = t3[cursor];

            if x != 0 && x != 0xFF && index < 0xFF {
                table[index] = x;
                index += 1;
            }
        }

        table[0] = 0;
        table[0xFF] = 0xFF;
        Self(table)
    }

    #[inline]
    pub fn apply(&self, data: &mut [u8]) {
        for x in data {
            *x = self.0[*x as usize];
        }
    }
}

impl fmt::Debug for SubstitutionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubstitutionTable")
            .field(&hex::encode(self.0))
            .finish()
    }
}

/// Expands one seed byte into a permutation of the 16 nibbles.
fn nibble_table(seed: u8) -> [u8; 0x10] {
    let seed = seed as u32;
    let mul = ((seed & 1) << 3) | 5;
    let add = (seed & 0xE) | 1;
    let mut state = seed >> 4;
    let mut table = [0u8; 0x10];

    for x in &mut table {
        state = state.wrapping_mul(mul).wrapping_add(add);
        *x = (state & 0xF) as u8;
    }

    table
}

const fn identity_table() -> [u8; 0x100] {
    let mut table = [0u8; 0x100];
    let mut i = 0;

    while i < 0x100 {
        table[i] = i as u8;
        i += 1;
    }

    table
}

const fn fixed_table() -> [u8; 0x100] {
    let mut table = [0u8; 0x100];
    let mut v = 0u32;
    let mut i = 0;

    while i < 0xFF {
        v = (v * 13 + 11) & 0xFF;

        if v == 0 || v == 0xFF {
            v = (v * 13 + 11) & 0xFF;
        }

        table[i] = v as u8;
        i += 1;
    }

    table[0] = 0;
    table[0xFF] = 0xFF;
    table
}
