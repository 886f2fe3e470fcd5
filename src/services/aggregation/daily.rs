use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::rounding::round_to;
use super::sample::{is_usable_for_average, is_usable_for_max, Sample};

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduction {
    Max,
    Mean,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    max: f64,
    sum: f64,
    count: u64,
}

impl Bucket {
    fn first(value: f64) -> Self {
        Self {
            max: value,
            sum: value,
            count: 1,
        }
    }

    fn push(&mut self, value: f64) {
        // Ties keep the stored maximum.
        if value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.count += 1;
    }
}

/// Highest usable power reading per UTC calendar day, unrounded.
pub fn max_per_day(series: &[Sample]) -> BTreeMap<String, f64> {
    reduce_per_day(series, Reduction::Max)
}

/// Mean usable temperature per UTC calendar day, rounded to 2 decimals.
pub fn avg_per_day(series: &[Sample]) -> BTreeMap<String, f64> {
    reduce_per_day(series, Reduction::Mean)
}

fn reduce_per_day(series: &[Sample], reduction: Reduction) -> BTreeMap<String, f64> {
    let usable: fn(&Sample) -> bool = match reduction {
        Reduction::Max => is_usable_for_max,
        Reduction::Mean => is_usable_for_average,
    };

    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for sample in series.iter().filter(|sample| usable(sample)) {
        buckets
            .entry(sample.timestamp.date_naive())
            .and_modify(|bucket| bucket.push(sample.value))
            .or_insert_with(|| Bucket::first(sample.value));
    }

    buckets
        .into_iter()
        .map(|(day, bucket)| {
            let value = match reduction {
                Reduction::Max => bucket.max,
                Reduction::Mean => round_to(bucket.sum / bucket.count as f64, 2),
            };
            (day.format(DAY_KEY_FORMAT).to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(value: f64, day: u32, hour: u32) -> Sample {
        Sample::new(value, Utc.with_ymd_and_hms(2023, 1, day, hour, 0, 0).unwrap())
    }

    #[test]
    fn empty_input_yields_empty_mapping() {
        assert!(max_per_day(&[]).is_empty());
        assert!(avg_per_day(&[]).is_empty());
    }

    #[test]
    fn max_keeps_highest_usable_reading_per_day() {
        let series = [
            sample(120.0, 1, 9),
            sample(310.5, 1, 12),
            sample(-5.0, 1, 13),
            sample(f64::NAN, 1, 14),
            sample(90.0, 2, 10),
        ];
        let result = max_per_day(&series);
        assert_eq!(result.len(), 2);
        assert_eq!(result["2023-01-01"], 310.5);
        assert_eq!(result["2023-01-02"], 90.0);
    }

    #[test]
    fn fully_invalid_power_input_yields_empty_mapping() {
        let series = [sample(-1.0, 1, 9), sample(f64::NAN, 1, 10)];
        assert!(max_per_day(&series).is_empty());
    }

    #[test]
    fn average_includes_negative_temperatures_and_rounds() {
        let series = [
            sample(-5.0, 1, 1),
            sample(10.0, 1, 2),
            sample(f64::NAN, 1, 3),
            sample(1.0, 2, 1),
            sample(2.0, 2, 2),
            sample(2.0, 2, 3),
        ];
        let result = avg_per_day(&series);
        assert_eq!(result["2023-01-01"], 2.5);
        // 5 / 3 = 1.666...
        assert_eq!(result["2023-01-02"], 1.67);
    }

    #[test]
    fn buckets_follow_utc_calendar_days() {
        let late = Utc.with_ymd_and_hms(2023, 1, 1, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2023, 1, 2, 1, 0, 0).unwrap();
        let series = [Sample::new(100.0, late), Sample::new(200.0, early)];

        let result = max_per_day(&series);
        assert_eq!(result.len(), 2);
        assert_eq!(result["2023-01-01"], 100.0);
        assert_eq!(result["2023-01-02"], 200.0);
    }

    #[test]
    fn reduction_does_not_depend_on_sample_order() {
        let forward = [sample(3.0, 1, 1), sample(7.0, 1, 2), sample(5.0, 1, 3)];
        let mut reversed = forward;
        reversed.reverse();

        assert_eq!(max_per_day(&forward), max_per_day(&reversed));
        assert_eq!(avg_per_day(&forward), avg_per_day(&reversed));
        assert_eq!(avg_per_day(&forward)["2023-01-01"], 5.0);
    }

    #[test]
    fn max_keeps_source_precision() {
        let series = [sample(123.456789123, 1, 12), sample(100.0, 1, 13)];
        assert_eq!(max_per_day(&series)["2023-01-01"], 123.456789123);
    }

    #[test]
    fn fully_non_finite_temperature_input_yields_empty_mapping() {
        let series = [
            sample(f64::NAN, 1, 9),
            sample(f64::INFINITY, 1, 10),
            sample(f64::NEG_INFINITY, 2, 11),
        ];
        assert!(avg_per_day(&series).is_empty());
    }

    #[test]
    fn average_rounding_follows_the_stored_value() {
        assert_eq!(avg_per_day(&[sample(0.015, 1, 1)])["2023-01-01"], 0.01);
        assert_eq!(avg_per_day(&[sample(1.115, 1, 1)])["2023-01-01"], 1.11);
        assert!(avg_per_day(&[sample(-0.001, 1, 1)])["2023-01-01"].is_sign_positive());
    }
}
