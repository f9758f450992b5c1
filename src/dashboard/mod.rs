//! Display-side derivations from device status snapshots.

mod climate;
mod roof;
mod soil;

pub use climate::{ClimateReadout, ClimateTracker, Reading};
pub use roof::RoofView;
pub use soil::{
    SoilGauge, SoilHistory, SoilHistoryPoint, SoilIndicator, OPTIMAL_MOISTURE,
    SOIL_HISTORY_CAPACITY,
};

use crate::device::{ControlMode, DeviceStatus, PumpStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterView {
    pub mode: Option<ControlMode>,
    pub pump: Option<PumpStatus>,
}

impl WaterView {
    pub fn from_status(status: &DeviceStatus) -> Self {
        Self {
            mode: status.mode,
            pump: status.pump_status,
        }
    }

    /// The pump can only be driven by hand in manual mode.
    pub fn can_toggle_pump(&self) -> bool {
        self.mode == Some(ControlMode::Manual)
    }

    pub fn summary(&self) -> String {
        let mode = match self.mode {
            Some(ControlMode::Auto) => "auto",
            Some(ControlMode::Manual) => "manual",
            None => "unknown",
        };
        let pump = match self.pump {
            Some(PumpStatus::On) => "on",
            Some(PumpStatus::Off) => "off",
            None => "unknown",
        };
        format!("Watering: {mode}  Pump: {pump}")
    }
}

/// One rendered snapshot across every card.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub status: DeviceStatus,
    pub soil: Option<SoilIndicator>,
    pub climate: ClimateReadout,
    pub roof: RoofView,
    pub water: WaterView,
}

impl DashboardView {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(4);
        if let Some(soil) = &self.soil {
            lines.push(soil.summary());
        }
        lines.push(self.climate.summary());
        lines.push(self.roof.summary());
        if self.water.mode.is_some() || self.water.pump.is_some() {
            lines.push(self.water.summary());
        }
        lines
    }
}

/// Accumulates derived state (soil history, placeholder cycle) across polls.
#[derive(Debug, Default)]
pub struct Dashboard {
    soil_history: SoilHistory,
    climate: ClimateTracker,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, status: &DeviceStatus) -> DashboardView {
        let soil = status.soil.map(SoilIndicator::new);
        if let Some(indicator) = &soil {
            self.soil_history.record_now(indicator.gauge);
        }

        DashboardView {
            status: status.clone(),
            soil,
            climate: self.climate.observe(status),
            roof: RoofView::from_status(status),
            water: WaterView::from_status(status),
        }
    }

    pub fn soil_history(&self) -> &SoilHistory {
        &self.soil_history
    }
}
