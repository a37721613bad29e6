// Angle and pulse-width limits for a servo model.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoConfig {
    pub min_angle: f32,
    pub max_angle: f32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub frequency_hz: u32,
}

impl ServoConfig {
    /// Generic analog servo, 1-2 ms.
    pub const STANDARD: Self = Self::new(0.0, 180.0, 1000, 2000, 50);
    pub const SG90: Self = Self::new(0.0, 180.0, 500, 2400, 50);
    pub const MG996R: Self = Self::new(0.0, 180.0, 500, 2500, 50);

    pub const fn new(
        min_angle: f32,
        max_angle: f32,
        min_pulse_us: u32,
        max_pulse_us: u32,
        frequency_hz: u32,
    ) -> Self {
        Self {
            min_angle,
            max_angle,
            min_pulse_us,
            max_pulse_us,
            frequency_hz,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.min_angle.is_finite() && self.max_angle.is_finite())
            || self.min_angle >= self.max_angle
        {
            return Err("servo angle range is empty");
        }
        if self.min_pulse_us >= self.max_pulse_us {
            return Err("servo pulse range is empty");
        }
        if self.frequency_hz == 0 || self.max_pulse_us >= self.period_us() {
            return Err("servo pulse does not fit in the PWM period");
        }
        Ok(())
    }

    pub fn period_us(&self) -> u32 {
        1_000_000 / self.frequency_hz.max(1)
    }

    pub fn neutral_pulse_us(&self) -> u32 {
        (self.min_pulse_us + self.max_pulse_us) / 2
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }

    /// Linear map, `None` outside the angle range.
    pub fn pulse_for_angle(&self, angle: f32) -> Option<u32> {
        if !self.contains(angle) {
            return None;
        }
        let t = (angle - self.min_angle) / (self.max_angle - self.min_angle);
        let span = (self.max_pulse_us - self.min_pulse_us) as f32;
        Some(self.min_pulse_us + (t * span + 0.5) as u32)
    }

    /// Duty count for `pulse_us` on an output whose full scale is `max_duty`.
    pub fn duty_for_pulse(&self, pulse_us: u32, max_duty: u16) -> u16 {
        let duty = pulse_us as u64 * self.frequency_hz as u64 * max_duty as u64 / 1_000_000;
        duty.min(max_duty as u64) as u16
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn presets_are_valid() {
        for cfg in [ServoConfig::STANDARD, ServoConfig::SG90, ServoConfig::MG996R] {
            assert_eq!(cfg.validate(), Ok(()));
            assert_eq!(cfg.period_us(), 20_000);
        }
        assert_eq!(ServoConfig::SG90.neutral_pulse_us(), 1450);
    }

    #[test]
    fn rejects_inverted_or_oversized_ranges() {
        assert!(ServoConfig::new(90.0, 0.0, 1000, 2000, 50).validate().is_err());
        assert!(ServoConfig::new(0.0, 180.0, 2000, 1000, 50).validate().is_err());
        assert!(ServoConfig::new(0.0, 180.0, 1000, 2000, 600).validate().is_err());
        assert!(ServoConfig::new(0.0, 180.0, 1000, 2000, 0).validate().is_err());
        assert!(ServoConfig::new(f32::NAN, 180.0, 1000, 2000, 50).validate().is_err());
    }

    #[test]
    fn known_points() {
        let cfg = ServoConfig::STANDARD;
        assert_eq!(cfg.pulse_for_angle(0.0), Some(1000));
        assert_eq!(cfg.pulse_for_angle(90.0), Some(1500));
        assert_eq!(cfg.pulse_for_angle(180.0), Some(2000));
        assert_eq!(cfg.pulse_for_angle(180.5), None);
        assert_eq!(cfg.pulse_for_angle(f32::NAN), None);
        // 1.5 ms of 20 ms on a 12-bit PCA9685
        assert_eq!(cfg.duty_for_pulse(1500, 4095), 307);
        assert_eq!(cfg.duty_for_pulse(1500, u16::MAX), 4915);
    }

    proptest! {
        #[test]
        fn pulse_is_monotonic_and_bounded(a in 0.0f32..=180.0, b in 0.0f32..=180.0) {
            let cfg = ServoConfig::MG996R;
            let (pa, pb) = (cfg.pulse_for_angle(a).unwrap(), cfg.pulse_for_angle(b).unwrap());
            prop_assert!((500..=2500).contains(&pa));
            if a <= b {
                prop_assert!(pa <= pb);
            }
        }

        #[test]
        fn duty_never_exceeds_max(pulse in 0u32..=20_000, max in 1u16..=u16::MAX) {
            prop_assert!(ServoConfig::STANDARD.duty_for_pulse(pulse, max) <= max);
        }
    }
}
