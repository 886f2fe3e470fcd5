use chrono::{DateTime, Utc};

/// One observed reading of a single field at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

/// Metric column a series is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Power,
    Temperature,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Power => "power",
            Field::Temperature => "temperature",
        }
    }
}

/// Power series of a single inverter. Samples of different entities are never paired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPowerSeries {
    pub series: Vec<Sample>,
}

impl EntityPowerSeries {
    pub fn new(series: Vec<Sample>) -> Self {
        Self { series }
    }
}

/// Inclusive `[start, end]` window handed to the metrics store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

// `DateTime<Utc>` cannot hold an invalid instant, so only the value is judged here.

pub fn is_usable_for_integration(sample: &Sample) -> bool {
    is_non_negative_reading(sample.value)
}

pub fn is_usable_for_max(sample: &Sample) -> bool {
    is_non_negative_reading(sample.value)
}

/// Sub-zero temperatures are physically valid, so negatives pass.
pub fn is_usable_for_average(sample: &Sample) -> bool {
    sample.value.is_finite()
}

fn is_non_negative_reading(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(value: f64) -> Sample {
        Sample::new(value, Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn power_modes_reject_negative_nan_and_infinite() {
        for value in [-5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(!is_usable_for_integration(&at(value)), "{value}");
            assert!(!is_usable_for_max(&at(value)), "{value}");
        }
        assert!(is_usable_for_integration(&at(0.0)));
        assert!(is_usable_for_max(&at(120.5)));
    }

    #[test]
    fn average_mode_accepts_sub_zero_temperatures() {
        assert!(is_usable_for_average(&at(-5.0)));
        assert!(is_usable_for_average(&at(31.2)));
        assert!(!is_usable_for_average(&at(f64::NAN)));
        assert!(!is_usable_for_average(&at(f64::INFINITY)));
    }

    #[test]
    fn field_columns_are_fixed() {
        assert_eq!(Field::Power.column(), "power");
        assert_eq!(Field::Temperature.column(), "temperature");
    }
}
