use crate::animation::values::Interpolatable;

/// How values between two keys are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    /// Hard step: the left key holds until the next key time.
    Constant,
    /// Hermite spline. Values are laid out `[in_tangent, value, out_tangent]` per key.
    Quadratic,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Last-used key index of one consumer of a track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

impl KeyframeCursor {
    pub fn reset(&mut self) {
        self.last_index = 0;
    }
}

/// An ordered `(time, value)` sequence.
///
/// Times must be non-decreasing. Sampling before the first key yields the
/// first value and after the last key the last value; an empty or
/// malformed track yields `None`.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> Default for KeyframeTrack<T> {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
            interpolation: InterpolationMode::Linear,
        }
    }
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Builds a track from `(time, value)` pairs.
    #[must_use]
    pub fn from_keys(keys: impl IntoIterator<Item = (f32, T)>, interpolation: InterpolationMode) -> Self {
        let (times, values) = keys.into_iter().unzip();
        Self::new(times, values, interpolation)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when sampling would find nothing, including when the value
    /// array is too short for the key count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let required = match self.interpolation {
            InterpolationMode::Quadratic => self.times.len() * 3,
            _ => self.times.len(),
        };
        self.times.is_empty() || self.values.len() < required
    }

    /// Samples without a cursor (binary search every call).
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let next_idx = self.times.partition_point(|&t| t <= time);
        let idx = next_idx.saturating_sub(1);
        Some(self.sample_at_frame(idx, time))
    }

    /// Sampling with a cursor: O(1) for sequential playback, local scan for
    /// small jumps either way, binary search for large ones.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let len = self.times.len();
        if len == 1 {
            cursor.last_index = 0;
            return Some(*self.get_value_at(0));
        }

        // A cursor left behind by a longer track restarts from the beginning.
        if cursor.last_index >= len {
            cursor.reset();
        }
        let i = cursor.last_index;
        let t_curr = self.times[i];

        let found_index = if time >= t_curr {
            // Forward playback: check [i, i+1), [i+1, i+2), ...
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let idx = i + offset;
                if idx >= len - 1 {
                    if time >= self.times[len - 1] {
                        res = Some(len - 1);
                    }
                    break;
                }
                if time < self.times[idx + 1] {
                    res = Some(idx);
                    break;
                }
            }
            res
        } else {
            // Backward seek or loop wrap.
            let mut res = None;
            for offset in 1..=MAX_SCAN_OFFSET {
                if i < offset {
                    break;
                }
                let idx = i - offset;
                if time >= self.times[idx] {
                    res = Some(idx);
                    break;
                }
            }
            res
        };

        let final_index = found_index.unwrap_or_else(|| {
            let next_idx = self.times.partition_point(|&t| t <= time);
            next_idx.saturating_sub(1)
        });
        cursor.last_index = final_index;

        Some(self.sample_at_frame(final_index, time))
    }

    /// Key value accessor honoring the quadratic layout.
    fn get_value_at(&self, index: usize) -> &T {
        match self.interpolation {
            InterpolationMode::Quadratic => &self.values[index * 3 + 1],
            _ => &self.values[index],
        }
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.times.len();

        if index >= len - 1 {
            return *self.get_value_at(len - 1);
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Constant => *self.get_value_at(index),
            InterpolationMode::Linear => {
                T::interpolate_linear(*self.get_value_at(index), *self.get_value_at(next_idx), t)
            }
            InterpolationMode::Quadratic => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;

                let v0 = self.values[i_prev + 1];
                let out_tangent0 = self.values[i_prev + 2];
                let in_tangent1 = self.values[i_next];
                let v1 = self.values[i_next + 1];

                T::interpolate_cubic(v0, out_tangent0, in_tangent1, v1, t, dt)
            }
        }
    }
}
