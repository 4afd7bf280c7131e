//! Elementwise arithmetic over population arrays.
//!
//! Lanes are processed four at a time through `wide`; the tail falls back to
//! scalar code. All kernels write into a private destination buffer, never into
//! a published array.
use wide::f64x4;

const LANES: usize = 4;

#[inline(always)]
fn load(chunk: &[f64]) -> f64x4 {
    f64x4::from([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// `dest[i] += src[i]`
pub fn add_assign(dest: &mut [f64], src: &[f64]) {
    let len = dest.len().min(src.len());
    let (dest, src) = (&mut dest[..len], &src[..len]);
    let mut d_chunks = dest.chunks_exact_mut(LANES);
    let mut s_chunks = src.chunks_exact(LANES);
    for (d, s) in (&mut d_chunks).zip(&mut s_chunks) {
        let sum = load(d) + load(s);
        d.copy_from_slice(&sum.to_array());
    }
    for (d, s) in d_chunks.into_remainder().iter_mut().zip(s_chunks.remainder()) {
        *d += *s;
    }
}

/// `dest[i] -= src[i]`
pub fn sub_assign(dest: &mut [f64], src: &[f64]) {
    let len = dest.len().min(src.len());
    let (dest, src) = (&mut dest[..len], &src[..len]);
    let mut d_chunks = dest.chunks_exact_mut(LANES);
    let mut s_chunks = src.chunks_exact(LANES);
    for (d, s) in (&mut d_chunks).zip(&mut s_chunks) {
        let diff = load(d) - load(s);
        d.copy_from_slice(&diff.to_array());
    }
    for (d, s) in d_chunks.into_remainder().iter_mut().zip(s_chunks.remainder()) {
        *d -= *s;
    }
}

/// `dest[i] /= divisor`
pub fn div_assign_scalar(dest: &mut [f64], divisor: f64) {
    let splat = f64x4::splat(divisor);
    let mut chunks = dest.chunks_exact_mut(LANES);
    for d in &mut chunks {
        let quotient = load(d) / splat;
        d.copy_from_slice(&quotient.to_array());
    }
    for d in chunks.into_remainder() {
        *d /= divisor;
    }
}

/// Elementwise equality within `tolerance`.
pub fn approx_eq(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}
