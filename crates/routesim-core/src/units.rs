//! Simulation units. Link capacities and package sizes are integral; logical time is a
//! fractional quantity (transmission windows are `size / bandwidth`), so [`SimTime`] wraps an
//! [`OrderedFloat`] to stay usable as a heap key and an argmin key.

use ordered_float::OrderedFloat;

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub fn into_f64(self) -> f64 {
                self.0 as f64
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }
    };
}

unit!(Bytes);

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

unit!(BytesPerSec);

impl std::fmt::Display for BytesPerSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B/s", self.0)
    }
}

/// A point (or span) of logical time, in seconds.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    derive_more::Add,
    derive_more::Sub,
    derive_more::AddAssign,
    derive_more::Sum,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct SimTime(OrderedFloat<f64>);

impl SimTime {
    /// Time zero.
    pub const ZERO: SimTime = SimTime(OrderedFloat(0.0));
    /// The end of time. `run()` drains everything scheduled before this.
    pub const MAX: SimTime = SimTime(OrderedFloat(f64::INFINITY));

    /// Creates a time from a number of seconds.
    pub const fn new(secs: f64) -> Self {
        Self(OrderedFloat(secs))
    }

    /// Returns the time as a number of seconds.
    pub const fn into_f64(self) -> f64 {
        self.0 .0
    }
}

impl From<f64> for SimTime {
    fn from(secs: f64) -> Self {
        Self::new(secs)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// The serialized transmission window of a package on a link.
impl std::ops::Div<BytesPerSec> for Bytes {
    type Output = SimTime;

    fn div(self, rhs: BytesPerSec) -> Self::Output {
        SimTime::new(self.into_f64() / rhs.into_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmission_window_is_fractional() {
        let window = Bytes::new(5) / BytesPerSec::new(10);
        assert_eq!(window, SimTime::new(0.5));
    }

    #[test]
    fn simtime_orders_totally() {
        let mut times = vec![SimTime::new(1.5), SimTime::ZERO, SimTime::new(0.25)];
        times.sort();
        assert_eq!(
            times,
            vec![SimTime::ZERO, SimTime::new(0.25), SimTime::new(1.5)]
        );
    }
}
