use crate::keys::{MASK_SIZE, MaskSet};

/// Unencrypted sub-header in front of every video payload.
pub const VIDEO_SUBHEADER_SIZE: usize = 0x40;
/// Smallest masked region, payloads shorter than this are stored in clear.
pub const VIDEO_MIN_MASKED_SIZE: usize = 0x200;

const LANE_MASK: usize = MASK_SIZE - 1;

/// Removes the video mask from a payload in place.
///
/// The region after `0x100` is unmasked first, since every lane of the first `0x100`
/// bytes is fed from the clear bytes of that region.
pub fn unmask_video(masks: &MaskSet, payload: &mut [u8]) {
    if payload.len() < VIDEO_SUBHEADER_SIZE + VIDEO_MIN_MASKED_SIZE {
        return;
    }

    let data = &mut payload[VIDEO_SUBHEADER_SIZE..];
    let mut mask = masks.video2;

    for i in 0x100..data.len() {
        data[i] ^= mask[i & LANE_MASK];
        mask[i & LANE_MASK] = data[i] ^ masks.video2[i & LANE_MASK];
    }

    let mut mask = masks.video1;

    for i in 0..0x100 {
        mask[i & LANE_MASK] ^= data[0x100 + i];
        data[i] ^= mask[i & LANE_MASK];
    }
}

#[cfg(test)]
pub(crate) fn mask_video(masks: &MaskSet, payload: &mut [u8]) {
    if payload.len() < VIDEO_SUBHEADER_SIZE + VIDEO_MIN_MASKED_SIZE {
        return;
    }

    let data = &mut payload[VIDEO_SUBHEADER_SIZE..];
    let mut mask = masks.video1;

    for i in 0..0x100 {
        mask[i & LANE_MASK] ^= data[0x100 + i];
        data[i] ^= mask[i & LANE_MASK];
    }

    let mut mask = masks.video2;

    for i in 0x100..data.len() {
        let plain = data[i];
        data[i] ^= mask[i & LANE_MASK];
        mask[i & LANE_MASK] = plain ^ masks.video2[i & LANE_MASK];
    }
}
