//! 16-bit checksum stamped on audio headers and blocks.

const TABLE: [u16; 0x100] = table(0x8005);

const fn table(polynomial: u16) -> [u16; 0x100] {
    let mut table = [0u16; 0x100];
    let mut i = 0;

    while i < 0x100 {
        let mut r = (i as u16) << 8;
        let mut bit = 0;

        while bit < 8 {
            r = if r & 0x8000 != 0 {
                (r << 1) ^ polynomial
            } else {
                r << 1
            };
            bit += 1;
        }

        table[i] = r;
        i += 1;
    }

    table
}

pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |sum, &b| {
        (sum << 8) ^ TABLE[((sum >> 8) as u8 ^ b) as usize]
    })
}

/// Overwrites the trailing two bytes of `data` with the checksum of everything before them.
///
/// Existing checksums are never verified, they are only regenerated after a transformation.
pub fn stamp(data: &mut [u8]) {
    if let Some(end) = data.len().checked_sub(2) {
        let sum = checksum(&data[..end]);
        data[end..].copy_from_slice(&sum.to_be_bytes());
    }
}
