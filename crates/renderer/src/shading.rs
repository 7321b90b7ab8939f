//! CPU evaluation of the iridescence colour law.
//!
//! This mirrors `FRAGMENT_SHADER_GLSL` in `compile.rs` term for term, in
//! `f32`, so the pattern can be checked without a GPU. The tests pin the
//! fragment stage's statements as well as the CPU golden values, so an edit
//! to either side fails until both agree.

use crate::inputs::FrameInputs;

/// Number of feedback iterations in the distortion loop.
pub const ITERATIONS: u32 = 8;

/// Colour of the pixel at texture coordinate `uv0` for the given inputs.
///
/// Pure: identical inputs always produce bit-identical output.
pub fn shade(uv0: [f32; 2], inputs: &FrameInputs) -> [f32; 4] {
    let [rx, ry] = inputs.resolution;
    let mr = rx.min(ry);
    let mut uv = [(uv0[0] * 2.0 - 1.0) * rx / mr, (uv0[1] * 2.0 - 1.0) * ry / mr];
    uv[0] += (inputs.pointer[0] - 0.5) * inputs.amplitude;
    uv[1] += (inputs.pointer[1] - 0.5) * inputs.amplitude;

    let phase = inputs.elapsed_time * 0.5 * inputs.speed;
    let mut d = -phase;
    let mut a = 0.0_f32;
    for step in 0..ITERATIONS {
        let i = step as f32;
        a += (i - d - a * uv[0]).cos();
        d += (uv[1] * i + a).sin();
    }
    d += phase;

    let col = [
        (uv[0] * d).cos() * 0.6 + 0.4,
        (uv[1] * a).cos() * 0.6 + 0.4,
        (a + d).cos() * 0.5 + 0.5,
    ];
    let swirl = [d.cos(), a.cos(), 2.5_f32.cos()];
    let mut out = [0.0, 0.0, 0.0, 1.0];
    for channel in 0..3 {
        out[channel] = (col[channel] * swirl[channel] * 0.5 + 0.5).cos() * inputs.tint[channel];
    }
    out
}
