//! Buffer transcoders between the stereo 16-bit boundary format and the
//! negotiated device format. Both transforms walk the buffer back to front
//! so they are safe when source and destination overlap, including the
//! fully in-place case where the input occupies the head of `buf`.

/// Expand interleaved 2-channel 16-bit frames in `buf[..input_len]` to
/// 4-channel frames, filling channels 3 and 4 with silence. `buf` must
/// hold at least `input_len * 2` bytes. Returns the number of bytes
/// produced; callers must treat that count as the buffer's valid length.
pub fn expand_stereo16_to_quad16(buf: &mut [u8], input_len: usize) -> usize {
    let frames = input_len / 4;
    let output_len = frames * 8;
    for frame in (0..frames).rev() {
        let src = frame * 4;
        let dst = frame * 8;
        // Silence first: those bytes belong to already-consumed frames.
        buf[dst + 7] = 0;
        buf[dst + 6] = 0;
        buf[dst + 5] = 0;
        buf[dst + 4] = 0;
        buf[dst + 3] = buf[src + 3];
        buf[dst + 2] = buf[src + 2];
        buf[dst + 1] = buf[src + 1];
        buf[dst] = buf[src];
    }
    output_len
}

/// Widen 16-bit little-endian samples in `buf[..input_len]` to packed
/// 3-byte little-endian samples, zero-filling the new low-order byte.
/// Lossless widening, no dithering. `buf` must hold at least
/// `input_len * 3 / 2` bytes. Returns the number of bytes produced.
pub fn widen_16_to_24_3(buf: &mut [u8], input_len: usize) -> usize {
    let samples = input_len / 2;
    let output_len = samples * 3;
    for sample in (0..samples).rev() {
        let src = sample * 2;
        let dst = sample * 3;
        buf[dst + 2] = buf[src + 1];
        buf[dst + 1] = buf[src];
        buf[dst] = 0;
    }
    output_len
}
