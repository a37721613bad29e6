// Change-threshold filter over a stream of readings.
//
// The first reading is always reported. After that a reading is reported
// only when it differs from the last *reported* one by at least the
// threshold, so slow drift still surfaces eventually.

use super::Sensor;

/// Distance between two readings, used against the change threshold.
pub trait Delta {
    fn delta(&self, other: &Self) -> f32;
}

macro_rules! int_delta {
    ($($t:ty),*) => {$(
        impl Delta for $t {
            #[inline]
            fn delta(&self, other: &Self) -> f32 {
                (*self as f32 - *other as f32).abs()
            }
        }
    )*};
}

int_delta!(u8, u16, u32, i16, i32);

impl Delta for f32 {
    #[inline]
    fn delta(&self, other: &Self) -> f32 {
        (self - other).abs()
    }
}

impl<T: Delta> Delta for Option<T> {
    fn delta(&self, other: &Self) -> f32 {
        match (self, other) {
            (Some(a), Some(b)) => a.delta(b),
            (None, None) => 0.0,
            _ => f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeResult<T> {
    pub new: T,
    pub old: Option<T>,
}

#[derive(Debug, Clone, Copy)]
pub struct Sampler<T> {
    last: Option<T>,
    threshold: f32,
}

impl<T: Delta + Copy> Sampler<T> {
    pub const fn new(threshold: f32) -> Self {
        Self {
            last: None,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Last reported reading.
    pub fn last(&self) -> Option<T> {
        self.last
    }

    pub fn update(&mut self, reading: T) -> Option<ChangeResult<T>> {
        match self.last {
            Some(old) if reading.delta(&old) < self.threshold => None,
            old => {
                self.last = Some(reading);
                Some(ChangeResult { new: reading, old })
            }
        }
    }

    /// Read the sensor once and filter the result.
    pub fn sample<S>(&mut self, sensor: &mut S) -> Result<Option<ChangeResult<T>>, S::Error>
    where
        S: Sensor<Reading = T>,
    {
        let reading = sensor.read()?;
        Ok(self.update(reading))
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp(i32);

    impl Sensor for Ramp {
        type Reading = i32;
        type Error = ();

        fn read(&mut self) -> Result<i32, ()> {
            self.0 += 1;
            Ok(self.0)
        }
    }

    #[test]
    fn first_reading_always_reported() {
        let mut s = Sampler::new(10.0);
        assert_eq!(s.update(5u16), Some(ChangeResult { new: 5, old: None }));
    }

    #[test]
    fn drift_accumulates_against_last_report() {
        let mut s = Sampler::new(3.0);
        let mut sensor = Ramp(0);
        let mut reports = std::vec::Vec::new();
        for _ in 0..10 {
            if let Some(c) = s.sample(&mut sensor).unwrap() {
                reports.push(c.new);
            }
        }
        assert_eq!(reports, [1, 4, 7, 10]);
        assert_eq!(s.last(), Some(10));
    }

    #[test]
    fn zero_threshold_reports_everything() {
        let mut s = Sampler::new(0.0);
        assert!(s.update(1.5f32).is_some());
        let c = s.update(1.5f32).unwrap();
        assert_eq!(c.old, Some(1.5));
    }

    #[test]
    fn option_readings_report_presence_changes() {
        let mut s: Sampler<Option<u32>> = Sampler::new(50.0);
        s.update(Some(100));
        assert!(s.update(Some(120)).is_none());
        assert!(s.update(None).is_some());
        s.reset();
        assert_eq!(s.last(), None);
    }
}
