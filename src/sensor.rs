//! Soil sensor contract and per-deployment binding.

use crate::error::Error;

/// Source of raw soil readings.
///
/// Reads are assumed short enough to run while the Context lock is held.
#[allow(async_fn_in_trait)]
pub trait SoilSensor {
    async fn read_raw(&mut self) -> Result<u16, Error>;
}

/// Which direction of the raw scale means wetter soil.
///
/// Resistive probes typically read higher when wet, capacitive probes
/// read lower. This is a deployment property, never assumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorPolarity {
    HigherIsWetter,
    LowerIsWetter,
}

/// How raw readings of one sensor are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorBinding {
    pub polarity: SensorPolarity,
    /// Smallest value a desired reading may be set to.
    pub min_reading: u16,
    /// Largest value a desired reading may be set to.
    pub max_reading: u16,
}

impl SensorBinding {
    /// `true` if soil reading `current` is drier than `desired`.
    pub fn is_drier(&self, current: u16, desired: u16) -> bool {
        match self.polarity {
            SensorPolarity::HigherIsWetter => current < desired,
            SensorPolarity::LowerIsWetter => current > desired,
        }
    }

    pub fn contains(&self, reading: u16) -> bool {
        (self.min_reading..=self.max_reading).contains(&reading)
    }

    /// Step a desired reading by `delta`, wrapping around the range ends.
    pub fn step(&self, reading: u16, delta: i32) -> u16 {
        let min = self.min_reading as i64;
        let span = self.max_reading as i64 - min + 1;
        let offset = (reading as i64 - min + delta as i64).rem_euclid(span);
        (min + offset) as u16
    }

    /// Clamp a stored or measured value into the binding's range.
    pub fn clamp(&self, reading: u16) -> u16 {
        reading.clamp(self.min_reading, self.max_reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WET_HIGH: SensorBinding = SensorBinding {
        polarity: SensorPolarity::HigherIsWetter,
        min_reading: 0,
        max_reading: 100,
    };

    const WET_LOW: SensorBinding = SensorBinding {
        polarity: SensorPolarity::LowerIsWetter,
        min_reading: 0,
        max_reading: 100,
    };

    #[test]
    fn drier_follows_polarity() {
        assert!(WET_HIGH.is_drier(10, 30));
        assert!(!WET_HIGH.is_drier(35, 30));
        assert!(!WET_HIGH.is_drier(30, 30));

        assert!(!WET_LOW.is_drier(10, 30));
        assert!(WET_LOW.is_drier(35, 30));
        assert!(!WET_LOW.is_drier(30, 30));
    }

    #[test]
    fn step_wraps_at_range_ends() {
        assert_eq!(WET_HIGH.step(0, -1), 100);
        assert_eq!(WET_HIGH.step(100, 1), 0);
        assert_eq!(WET_HIGH.step(50, 3), 53);

        let offset = SensorBinding {
            min_reading: 10,
            max_reading: 20,
            ..WET_HIGH
        };
        assert_eq!(offset.step(10, -1), 20);
        assert_eq!(offset.step(20, 2), 11);
    }

    #[test]
    fn clamp_keeps_values_in_range() {
        let binding = SensorBinding {
            min_reading: 5,
            max_reading: 50,
            ..WET_LOW
        };
        assert_eq!(binding.clamp(0), 5);
        assert_eq!(binding.clamp(60), 50);
        assert_eq!(binding.clamp(20), 20);
    }
}
