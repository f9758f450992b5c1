use crate::device::DeviceStatus;

const PLACEHOLDER_TEMPERATURES: [f64; 4] = [24.0, 25.0, 26.0, 25.0];
const PLACEHOLDER_HUMIDITY: [f64; 4] = [68.0, 70.0, 72.0, 70.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Measured(f64),
    Placeholder(f64),
}

impl Reading {
    pub fn value(self) -> f64 {
        match self {
            Self::Measured(value) | Self::Placeholder(value) => value,
        }
    }

    pub fn is_measured(self) -> bool {
        matches!(self, Self::Measured(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReadout {
    pub temperature: Reading,
    pub humidity: Reading,
}

impl ClimateReadout {
    pub fn summary(&self) -> String {
        format!(
            "Temperature: {:.1}°C{}  Humidity: {:.0}%{}",
            self.temperature.value(),
            estimate_marker(self.temperature),
            self.humidity.value(),
            estimate_marker(self.humidity),
        )
    }
}

fn estimate_marker(reading: Reading) -> &'static str {
    if reading.is_measured() {
        ""
    } else {
        " (est.)"
    }
}

/// Produces climate readouts from successive snapshots. Missing readings are
/// filled from a fixed placeholder cycle that advances once per snapshot.
#[derive(Debug, Default)]
pub struct ClimateTracker {
    tick: usize,
}

impl ClimateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, status: &DeviceStatus) -> ClimateReadout {
        let slot = self.tick % PLACEHOLDER_TEMPERATURES.len();
        self.tick = self.tick.wrapping_add(1);

        ClimateReadout {
            temperature: status
                .temperature
                .map_or(Reading::Placeholder(PLACEHOLDER_TEMPERATURES[slot]), Reading::Measured),
            humidity: status
                .humidity
                .map_or(Reading::Placeholder(PLACEHOLDER_HUMIDITY[slot]), Reading::Measured),
        }
    }
}
