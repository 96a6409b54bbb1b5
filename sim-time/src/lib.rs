//! The monotonic virtual clock type shared by the scheduler and topology service.
//!
//! [`SimulationTime`] is a count of virtual nanoseconds since the start of a run. All arithmetic
//! saturates at [`SimulationTime::MAX`] rather than wrapping, since a wrapped delivery time would
//! silently corrupt event ordering.

#![deny(unsafe_op_in_unsafe_fn)]

use std::fmt;
use std::time::Duration;

/// A point in virtual time, in nanoseconds since the simulation began.
///
/// `Ord`/`PartialOrd` give the total order events are scheduled by. Construction always goes
/// through the `from_*` helpers or arithmetic on an existing value, so a `SimulationTime` can
/// never represent a negative offset.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct SimulationTime(u64);

impl SimulationTime {
    /// The zero point of virtual time.
    pub const ZERO: Self = Self(0);

    /// The largest representable simulation time. Reserved so that saturating arithmetic always
    /// has a finite fixed point distinct from an overflowed wraparound.
    pub const MAX: Self = Self(u64::MAX);

    pub const NANOSECOND: Self = Self(1);
    pub const MICROSECOND: Self = Self(1_000);
    pub const MILLISECOND: Self = Self(1_000_000);
    pub const SECOND: Self = Self(1_000_000_000);

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(Self::MICROSECOND.0))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(Self::MILLISECOND.0))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(Self::SECOND.0))
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub const fn as_micros(self) -> u64 {
        self.0 / Self::MICROSECOND.0
    }

    pub const fn as_millis(self) -> u64 {
        self.0 / Self::MILLISECOND.0
    }

    pub const fn as_secs(self) -> u64 {
        self.0 / Self::SECOND.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    pub const fn saturating_mul(self, rhs: u64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl From<Duration> for SimulationTime {
    fn from(d: Duration) -> Self {
        Self::from_nanos(d.as_nanos().min(u64::MAX as u128) as u64)
    }
}

impl std::ops::Add for SimulationTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl std::ops::AddAssign for SimulationTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for SimulationTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl std::ops::SubAssign for SimulationTime {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Debug for SimulationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

impl fmt::Display for SimulationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs();
        let sub_nanos = self.0 % Self::SECOND.0;
        write!(f, "{secs:02}:{:09}", sub_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_instead_of_wrapping() {
        let almost_max = SimulationTime::MAX.saturating_sub(SimulationTime::from_nanos(1));
        assert_eq!(
            almost_max.saturating_add(SimulationTime::from_nanos(2)),
            SimulationTime::MAX
        );
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let t = SimulationTime::from_nanos(5);
        assert_eq!(
            t.saturating_sub(SimulationTime::from_nanos(10)),
            SimulationTime::ZERO
        );
    }

    #[test]
    fn ordering_matches_nanos() {
        let a = SimulationTime::from_millis(1);
        let b = SimulationTime::from_micros(1_001);
        assert!(a < b);
    }

    #[test]
    fn conversions_round_trip() {
        let t = SimulationTime::from_secs(3) + SimulationTime::from_millis(250);
        assert_eq!(t.as_millis(), 3_250);
    }
}
