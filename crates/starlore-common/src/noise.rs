//! Deterministic 2D value noise (spec §4.4), converted from
//! `original_source/src/common/perlin_noise.c`. Despite the original's
//! filename this is value noise, not gradient (Perlin) noise: a uniform
//! random scratch grid, bilinearly blended across octaves of increasing
//! pitch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces a `width * height` grid in `[0, 1]`, row-major (`y * width + x`).
/// Pure in its inputs: same `(seed, width, height, octaves, bias)` always
/// produces the same grid (spec P3).
pub fn generate_2d(seed: u32, width: usize, height: usize, octaves: i32, bias: f32) -> Vec<f32> {
    assert!(width > 0 && height > 0);
    assert!(octaves >= 1);

    let len = width * height;
    let mut rng = StdRng::seed_from_u64(seed as u64);
    let scratch: Vec<f32> = (0..len).map(|_| rng.gen::<f32>()).collect();

    let mut output = vec![0.0f32; len];
    for x in 0..width {
        for y in 0..height {
            let mut noise = 0.0f32;
            let mut scale_accumulator = 0.0f32;
            let mut scale = 1.0f32;

            for o in 0..octaves {
                let pitch = (width >> o).max(1);
                let sample_x1 = (x / pitch) * pitch;
                let sample_y1 = (y / pitch) * pitch;
                let sample_x2 = (sample_x1 + pitch) % width;
                let sample_y2 = (sample_y1 + pitch) % width;

                let blend_x = (x - sample_x1) as f32 / pitch as f32;
                let blend_y = (y - sample_y1) as f32 / pitch as f32;

                let sample_t = (1.0 - blend_x) * scratch[sample_y1 * width + sample_x1]
                    + blend_x * scratch[sample_y1 * width + sample_x2];
                let sample_b = (1.0 - blend_x) * scratch[sample_y2 * width + sample_x1]
                    + blend_x * scratch[sample_y2 * width + sample_x2];

                scale_accumulator += scale;
                noise += (blend_y * (sample_b - sample_t) + sample_t) * scale;
                scale /= bias;
            }

            output[y * width + x] = noise / scale_accumulator;
        }
    }

    output
}

/// Combines the world seed with integer chunk coordinates into a per-chunk
/// seed, so that each chunk is an independently deterministic noise field
/// (spec §3: a chunk's contents are a pure function of `(seed, x, y,
/// octave_count, bias)`).
pub fn chunk_seed(world_seed: u32, chunk_x: i32, chunk_y: i32) -> u32 {
    let cx = chunk_x as u32;
    let cy = chunk_y as u32;
    world_seed
        .wrapping_mul(0x9E37_79B1)
        .wrapping_add(cx.wrapping_mul(0x85EB_CA77))
        .wrapping_add(cy.wrapping_mul(0xC2B2_AE3D))
}
