use std::collections::VecDeque;
use std::ops::RangeInclusive;

use chrono::{Local, NaiveTime};

use crate::device::SoilState;

pub const DRY_MOISTURE_PERCENT: u8 = 35;
pub const WET_MOISTURE_PERCENT: u8 = 75;
pub const OPTIMAL_MOISTURE: RangeInclusive<u8> = 60..=75;
/// Five minutes of history at the default 5 s poll interval.
pub const SOIL_HISTORY_CAPACITY: usize = 60;

const HISTORY_LABEL_FORMAT: &str = "%H:%M:%S";

/// Moisture gauge derived from the coarse soil sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoilGauge {
    percent: u8,
}

impl SoilGauge {
    pub fn from_soil(soil: SoilState) -> Self {
        let percent = match soil {
            SoilState::Dry => DRY_MOISTURE_PERCENT,
            SoilState::Wet | SoilState::Unknown => WET_MOISTURE_PERCENT,
        };
        Self { percent }
    }

    pub fn percent(self) -> u8 {
        self.percent
    }

    pub fn is_optimal(self) -> bool {
        OPTIMAL_MOISTURE.contains(&self.percent)
    }

    pub fn label(self) -> &'static str {
        if self.is_optimal() {
            "Optimal"
        } else {
            "Dry"
        }
    }
}

/// Soil card indicator: the raw reading plus whether it needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoilIndicator {
    pub soil: SoilState,
    pub gauge: SoilGauge,
}

impl SoilIndicator {
    pub fn new(soil: SoilState) -> Self {
        Self {
            soil,
            gauge: SoilGauge::from_soil(soil),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.soil != SoilState::Dry && self.gauge.is_optimal()
    }

    pub fn summary(&self) -> String {
        format!(
            "Soil moisture: {}% ({})",
            self.gauge.percent(),
            self.gauge.label()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoilHistoryPoint {
    pub time: String,
    pub value: u8,
}

/// Rolling window of gauge readings, oldest first.
#[derive(Debug, Clone)]
pub struct SoilHistory {
    points: VecDeque<SoilHistoryPoint>,
    capacity: usize,
}

impl Default for SoilHistory {
    fn default() -> Self {
        Self::with_capacity(SOIL_HISTORY_CAPACITY)
    }
}

impl SoilHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record_now(&mut self, gauge: SoilGauge) {
        self.record_at(Local::now().time(), gauge);
    }

    pub fn record_at(&mut self, time: NaiveTime, gauge: SoilGauge) {
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(SoilHistoryPoint {
            time: time.format(HISTORY_LABEL_FORMAT).to_string(),
            value: gauge.percent(),
        });
    }

    pub fn points(&self) -> impl Iterator<Item = &SoilHistoryPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&SoilHistoryPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, second).unwrap()
    }

    #[test]
    fn gauge_maps_dry_below_optimal_band() {
        let dry = SoilGauge::from_soil(SoilState::Dry);
        assert_eq!(dry.percent(), 35);
        assert!(!dry.is_optimal());
        assert_eq!(dry.label(), "Dry");

        let wet = SoilGauge::from_soil(SoilState::Wet);
        assert_eq!(wet.percent(), 75);
        assert!(wet.is_optimal());
        assert_eq!(wet.label(), "Optimal");
    }

    #[test]
    fn indicator_flags_dry_soil_as_non_optimal() {
        let indicator = SoilIndicator::new(SoilState::Dry);
        assert!(!indicator.is_optimal());
        assert_eq!(indicator.summary(), "Soil moisture: 35% (Dry)");

        assert!(SoilIndicator::new(SoilState::Wet).is_optimal());
    }

    #[test]
    fn history_labels_points_with_wall_clock_time() {
        let mut history = SoilHistory::default();
        history.record_at(at(9, 5, 3), SoilGauge::from_soil(SoilState::Dry));

        assert_eq!(
            history.latest(),
            Some(&SoilHistoryPoint {
                time: "09:05:03".to_string(),
                value: 35,
            })
        );
    }

    #[test]
    fn history_keeps_only_the_most_recent_points() {
        let mut history = SoilHistory::default();
        for second in 0..(SOIL_HISTORY_CAPACITY as u32 + 5) {
            let soil = if second % 2 == 0 {
                SoilState::Dry
            } else {
                SoilState::Wet
            };
            history.record_at(
                at(12, second / 60, second % 60),
                SoilGauge::from_soil(soil),
            );
        }

        assert_eq!(history.len(), SOIL_HISTORY_CAPACITY);
        assert_eq!(
            history.points().next().map(|point| point.time.as_str()),
            Some("12:00:05")
        );
        assert_eq!(
            history.latest().map(|point| point.time.as_str()),
            Some("12:01:04")
        );
    }
}
