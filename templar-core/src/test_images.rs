//! Deterministic synthetic page images for tests.
//!
//! Pages are 256x256 grayscale PNGs built from an 8x8 grid of pseudo-random
//! cells. Different seeds produce pages whose perceptual fingerprints are
//! far apart; the speckled variant perturbs pixel values slightly so its
//! fingerprint stays within a few bits of the clean page.

use std::io::Cursor;

use image::{GrayImage, Luma};

const SIDE: u32 = 256;
const CELL: u32 = 32;

fn xorshift(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

fn cells(seed: u32) -> [[u8; 8]; 8] {
    let mut state = seed.wrapping_mul(0x9E37_79B9) | 1;
    let mut grid = [[0u8; 8]; 8];
    for row in grid.iter_mut() {
        for cell in row.iter_mut() {
            *cell = (xorshift(&mut state) % 256) as u8;
        }
    }
    grid
}

fn encode(image: GrayImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("PNG encoding failed");
    buffer.into_inner()
}

/// A synthetic page; distinct seeds yield visually-distinct layouts.
pub fn page(seed: u32) -> Vec<u8> {
    let grid = cells(seed);
    let image = GrayImage::from_fn(SIDE, SIDE, |x, y| {
        Luma([grid[(y / CELL) as usize][(x / CELL) as usize]])
    });
    encode(image)
}

/// The page for `seed` with light deterministic pixel noise — the same
/// layout "filled in with different data".
pub fn page_speckled(seed: u32) -> Vec<u8> {
    let grid = cells(seed);
    let image = GrayImage::from_fn(SIDE, SIDE, |x, y| {
        let base = grid[(y / CELL) as usize][(x / CELL) as usize];
        let noise = ((x * 31 + y * 17) % 5) as i16 - 2;
        Luma([(base as i16 + noise).clamp(0, 255) as u8])
    });
    encode(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::render::{DecodeRenderer, PageRenderer};

    fn fingerprint_of(payload: &[u8]) -> Fingerprint {
        let image = DecodeRenderer::new()
            .render_first_page_bytes(payload)
            .unwrap()
            .unwrap();
        Fingerprint::of_image(&image).unwrap()
    }

    #[test]
    fn test_distinct_seeds_are_far_apart() {
        let a = fingerprint_of(&page(1));
        let b = fingerprint_of(&page(2));
        let c = fingerprint_of(&page(3));

        assert!(a.hamming_distance(&b) > 12, "a-b: {}", a.hamming_distance(&b));
        assert!(a.hamming_distance(&c) > 12, "a-c: {}", a.hamming_distance(&c));
        assert!(b.hamming_distance(&c) > 12, "b-c: {}", b.hamming_distance(&c));
    }

    #[test]
    fn test_speckled_page_stays_near() {
        let clean = fingerprint_of(&page(1));
        let noisy = fingerprint_of(&page_speckled(1));
        assert!(
            clean.hamming_distance(&noisy) <= 12,
            "distance: {}",
            clean.hamming_distance(&noisy)
        );
    }
}
