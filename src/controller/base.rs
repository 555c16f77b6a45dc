use bitflags::bitflags;

use crate::controller::{ControllerKind, TargetRef};
use crate::source::{self, BlockId, ControllerRecord, ModelSource, SourceError};

bitflags! {
    /// Controller flags word as stored in the record.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ControllerFlags: u16 {
        /// Two-bit extrapolation field, decoded by [`LoopMode::from_flags`].
        const EXTRAPOLATION = 0b11 << 1;
        const ACTIVE        = 1 << 3;
    }
}

/// What happens when the remapped time leaves `[start, stop]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Wrap around (cyclic).
    Loop,
    /// Wrap around, playing every other period backwards.
    PingPong,
    /// Clamp to the window.
    #[default]
    Once,
}

impl LoopMode {
    /// Decodes the extrapolation field of a controller flags word.
    #[must_use]
    pub fn from_flags(flags: ControllerFlags) -> Self {
        match (flags & ControllerFlags::EXTRAPOLATION).bits() >> 1 {
            0 => Self::Loop,
            1 => Self::PingPong,
            _ => Self::Once,
        }
    }

    /// Encodes back into the extrapolation field.
    #[must_use]
    pub fn to_flags(self) -> ControllerFlags {
        let mode: u16 = match self {
            Self::Loop => 0,
            Self::PingPong => 1,
            Self::Once => 2,
        };
        ControllerFlags::from_bits_retain(mode << 1)
    }
}

/// Maps a query time into a controller's local window.
///
/// `t' = time * frequency + phase`; inside the window it is returned as
/// is, outside it is folded according to `mode`. A looping window is
/// half-open `[start, stop)` so that every whole period maps to `start`;
/// the other modes use `[start, stop]`. A window with `stop <= start`
/// collapses to `start`.
#[must_use]
pub fn remap_time(time: f32, frequency: f32, phase: f32, start: f32, stop: f32, mode: LoopMode) -> f32 {
    let time = time * frequency + phase;

    let inside = match mode {
        LoopMode::Loop => time >= start && time < stop,
        LoopMode::PingPong | LoopMode::Once => time >= start && time <= stop,
    };
    if inside {
        return time;
    }

    match mode {
        LoopMode::Loop => {
            let delta = stop - start;
            if delta <= 0.0 {
                return start;
            }
            let x = (time - start) / delta;
            let y = (x - x.floor()) * delta;
            start + y
        }
        LoopMode::PingPong => {
            let delta = stop - start;
            if delta <= 0.0 {
                return start;
            }
            let x = (time - start) / delta;
            let y = (x - x.floor()) * delta;
            if (x.floor().abs() as i64) % 2 == 0 {
                start + y
            } else {
                stop - y
            }
        }
        LoopMode::Once => {
            if time < start {
                start
            } else if time > stop {
                stop
            } else {
                time
            }
        }
    }
}

/// State every controller kind shares: binding, window and activation.
#[derive(Debug, Clone)]
pub struct ControllerBase {
    pub(crate) block: BlockId,
    pub(crate) kind: ControllerKind,
    pub(crate) target: TargetRef,

    pub active: bool,
    pub loop_mode: LoopMode,
    pub start: f32,
    pub stop: f32,
    pub phase: f32,
    pub frequency: f32,

    pub(crate) data: Option<BlockId>,
    pub(crate) interpolator: Option<BlockId>,
    pub(crate) variable1: String,
    pub(crate) variable2: String,

    /// Last refresh succeeded.
    pub(crate) bound: bool,
    /// Target was found destroyed; never cleared.
    pub(crate) orphaned: bool,
}

impl ControllerBase {
    #[must_use]
    pub(crate) fn new(block: BlockId, kind: ControllerKind, target: TargetRef) -> Self {
        Self {
            block,
            kind,
            target,
            active: false,
            loop_mode: LoopMode::Once,
            start: 0.0,
            stop: 0.0,
            phase: 0.0,
            frequency: 1.0,
            data: None,
            interpolator: None,
            variable1: String::new(),
            variable2: String::new(),
            bound: false,
            orphaned: false,
        }
    }

    /// Re-reads the shared fields from the controller record and returns the
    /// record so the concrete kind can read its own fields.
    pub fn refresh<'s>(&mut self, source: &'s ModelSource) -> source::Result<&'s ControllerRecord> {
        let record = source.controller(self.block)?;
        let found = record.params.kind();
        if found != self.kind {
            return Err(SourceError::KindMismatch {
                id: self.block,
                expected: self.kind.type_name(),
                found: found.type_name(),
            });
        }

        let flags = ControllerFlags::from_bits_retain(record.flags);
        self.active = flags.contains(ControllerFlags::ACTIVE);
        self.loop_mode = LoopMode::from_flags(flags);
        self.start = record.start_time;
        self.stop = record.stop_time;
        self.phase = record.phase;
        self.frequency = record.frequency;
        self.variable1.clone_from(&record.variable1);
        self.variable2.clone_from(&record.variable2);

        self.interpolator = record.interpolator;
        // Newer files keep the data link on the interpolator.
        self.data = record.data.or_else(|| {
            record
                .interpolator
                .and_then(|interpolator| source.interpolator_data(interpolator).ok().flatten())
        });

        Ok(record)
    }

    /// Points the controller at a new interpolator and its data.
    pub(crate) fn set_interpolator(&mut self, interpolator: BlockId, source: &ModelSource) {
        self.interpolator = Some(interpolator);
        if let Ok(Some(data)) = source.interpolator_data(interpolator) {
            self.data = Some(data);
        }
    }

    #[inline]
    #[must_use]
    pub fn ctrl_time(&self, time: f32) -> f32 {
        remap_time(time, self.frequency, self.phase, self.start, self.stop, self.loop_mode)
    }

    pub fn set_timing(&mut self, start: f32, stop: f32, phase: f32, frequency: f32) {
        self.start = start;
        self.stop = stop;
        self.phase = phase;
        self.frequency = frequency;
    }

    /// An empty requested variable matches anything.
    #[must_use]
    pub fn matches_variables(&self, variable1: &str, variable2: &str) -> bool {
        (variable1.is_empty() || variable1 == self.variable1) && (variable2.is_empty() || variable2 == self.variable2)
    }

    #[inline]
    #[must_use]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> TargetRef {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<BlockId> {
        self.data
    }

    #[inline]
    #[must_use]
    pub fn interpolator(&self) -> Option<BlockId> {
        self.interpolator
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound && !self.orphaned
    }

    #[inline]
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        self.orphaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn flags_decode_loop_mode() {
        let decode = |bits: u16| LoopMode::from_flags(ControllerFlags::from_bits_retain(bits));
        assert_eq!(decode(0x08), LoopMode::Loop);
        assert_eq!(decode(0x0A), LoopMode::PingPong);
        assert_eq!(decode(0x0C), LoopMode::Once);
        assert_eq!(decode(0x0E), LoopMode::Once);
        // Unknown high bits are kept but do not disturb the decode.
        assert_eq!(decode(0x8002), LoopMode::PingPong);
        assert!(!ControllerFlags::from_bits_retain(0x04).contains(ControllerFlags::ACTIVE));
        for mode in [LoopMode::Loop, LoopMode::PingPong, LoopMode::Once] {
            assert_eq!(LoopMode::from_flags(mode.to_flags()), mode);
        }
    }

    #[test]
    fn inside_window_is_identity() {
        assert!(approx(remap_time(1.5, 1.0, 0.0, 1.0, 3.0, LoopMode::Loop), 1.5));
        assert!(approx(remap_time(1.5, 1.0, 0.0, 1.0, 3.0, LoopMode::Once), 1.5));
    }

    #[test]
    fn frequency_and_phase_apply_first() {
        // 1.0 * 2 + 0.5 = 2.5
        assert!(approx(remap_time(1.0, 2.0, 0.5, 0.0, 10.0, LoopMode::Once), 2.5));
    }

    #[test]
    fn clamp_mode_pins_to_boundaries() {
        assert!(approx(remap_time(-4.0, 1.0, 0.0, 1.0, 3.0, LoopMode::Once), 1.0));
        assert!(approx(remap_time(9.0, 1.0, 0.0, 1.0, 3.0, LoopMode::Once), 3.0));
    }

    #[test]
    fn loop_mode_wraps_both_directions() {
        assert!(approx(remap_time(3.5, 1.0, 0.0, 1.0, 3.0, LoopMode::Loop), 1.5));
        assert!(approx(remap_time(0.5, 1.0, 0.0, 1.0, 3.0, LoopMode::Loop), 2.5));
        assert!(approx(remap_time(7.25, 1.0, 0.0, 1.0, 3.0, LoopMode::Loop), 1.25));
    }

    #[test]
    fn loop_mode_treats_stop_as_next_period() {
        for k in 0..5 {
            let t = 1.0 + 2.0 * k as f32;
            assert!(approx(remap_time(t, 1.0, 0.0, 1.0, 3.0, LoopMode::Loop), 1.0), "k = {k}");
        }
        // Clamp keeps the closed window.
        assert!(approx(remap_time(3.0, 1.0, 0.0, 1.0, 3.0, LoopMode::Once), 3.0));
    }

    #[test]
    fn ping_pong_mirrors_odd_periods() {
        // Period 0 forward, period 1 backward.
        assert!(approx(remap_time(2.5, 1.0, 0.0, 0.0, 2.0, LoopMode::PingPong), 1.5));
        assert!(approx(remap_time(4.5, 1.0, 0.0, 0.0, 2.0, LoopMode::PingPong), 0.5));
        assert!(approx(remap_time(-0.5, 1.0, 0.0, 0.0, 2.0, LoopMode::PingPong), 0.5));
    }

    #[test]
    fn degenerate_window_collapses_to_start() {
        assert!(approx(remap_time(5.0, 1.0, 0.0, 2.0, 2.0, LoopMode::Loop), 2.0));
        assert!(approx(remap_time(5.0, 1.0, 0.0, 2.0, 1.0, LoopMode::PingPong), 2.0));
    }
}
