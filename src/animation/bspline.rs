//! Cubic B-spline evaluation over quantized control points.
//!
//! Control points are `i16`, decompressed as
//! `offset + raw / 32767 * half_range`. The knot vector is clamped and
//! uniform, so the curve passes through the first and last control points
//! and the parameter runs over `[0, n - DEGREE]`.

pub const DEGREE: usize = 3;

const SHORT_MAX: f32 = 32767.0;

/// Knot `i` of a clamped uniform vector for `n` control points.
#[inline]
fn knot(i: usize, n: usize) -> f32 {
    if i <= DEGREE {
        0.0
    } else if i >= n {
        (n - DEGREE) as f32
    } else {
        (i - DEGREE) as f32
    }
}

/// Non-zero basis functions at `u` for knot span `span`.
fn basis_functions(span: usize, u: f32, n: usize) -> [f32; DEGREE + 1] {
    let mut basis = [0.0; DEGREE + 1];
    let mut left = [0.0; DEGREE + 1];
    let mut right = [0.0; DEGREE + 1];
    basis[0] = 1.0;

    for j in 1..=DEGREE {
        left[j] = u - knot(span + 1 - j, n);
        right[j] = knot(span + j, n) - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom.abs() > f32::EPSILON { basis[r] / denom } else { 0.0 };
            basis[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        basis[j] = saved;
    }

    basis
}

/// Evaluates an `N`-dimensional channel.
///
/// `handle` is the index of the channel's first short in `points`; the
/// channel occupies `n * N` shorts. Returns `None` when the channel is
/// absent, too short, or `n` is not more than the degree.
#[must_use]
pub fn evaluate<const N: usize>(
    points: &[i16],
    handle: u32,
    n: usize,
    u: f32,
    offset: f32,
    half_range: f32,
) -> Option<[f32; N]> {
    if n <= DEGREE {
        return None;
    }
    let start = handle as usize;
    let end = start.checked_add(n.checked_mul(N)?)?;
    let channel = points.get(start..end)?;

    let domain = (n - DEGREE) as f32;
    let u = if u.is_finite() { u.clamp(0.0, domain) } else { 0.0 };
    let span = ((u.floor() as usize) + DEGREE).min(n - 1);
    let basis = basis_functions(span, u, n);

    let mut out = [0.0; N];
    for (r, weight) in basis.iter().enumerate() {
        let point = span - DEGREE + r;
        for (c, value) in out.iter_mut().enumerate() {
            let raw = f32::from(channel[point * N + c]);
            *value += weight * (offset + raw / SHORT_MAX * half_range);
        }
    }

    Some(out)
}
