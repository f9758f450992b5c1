//! Roof and irrigation actuation.
//!
//! Water endpoints return nothing useful; their effect shows up in the next
//! `/status`, so every water action ends with a poller refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::device::{ControlMode, DeviceApi, DeviceError, DeviceStatus, PumpStatus, RoofUpdate};
use crate::poller::PollerHandle;

pub type ControlResult<T> = std::result::Result<T, ControlError>;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("another control action is still running")]
    Busy,
    #[error("pump can only be driven by hand in manual mode")]
    NotManualMode,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpAction {
    Start,
    Stop,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Controls {
    api: Arc<dyn DeviceApi>,
    busy: AtomicBool,
}

impl Controls {
    pub fn new(api: Arc<dyn DeviceApi>) -> Self {
        Self {
            api,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> ControlResult<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| ControlError::Busy)
    }

    /// Overrides the rain sensor; the device answers with the new roof position.
    pub async fn rain_manual(&self, raining: bool) -> ControlResult<RoofUpdate> {
        let _guard = self.acquire()?;
        let update = self.api.set_rain_manual(raining).await?;
        tracing::info!(raining, roof = update.roof_status.label(), "rain override applied");
        Ok(update)
    }

    pub async fn rain_auto(&self) -> ControlResult<RoofUpdate> {
        let _guard = self.acquire()?;
        let update = self.api.set_rain_auto().await?;
        tracing::info!(roof = update.roof_status.label(), "rain sensor back in control");
        Ok(update)
    }

    /// Starts the pump when it is off and stops it when it is on.
    pub async fn toggle_pump(
        &self,
        status: &DeviceStatus,
        poller: &PollerHandle,
    ) -> ControlResult<PumpAction> {
        let action = match status.require_pump_status()? {
            PumpStatus::On => PumpAction::Stop,
            PumpStatus::Off => PumpAction::Start,
        };
        self.drive_pump(action, status, poller).await?;
        Ok(action)
    }

    pub async fn drive_pump(
        &self,
        action: PumpAction,
        status: &DeviceStatus,
        poller: &PollerHandle,
    ) -> ControlResult<()> {
        if status.require_mode()? != ControlMode::Manual {
            return Err(ControlError::NotManualMode);
        }
        let _guard = self.acquire()?;
        match action {
            PumpAction::Start => self.api.start_watering().await?,
            PumpAction::Stop => self.api.stop_watering().await?,
        }
        tracing::info!(?action, "pump command sent");
        poller.refresh().await;
        Ok(())
    }

    pub async fn enable_auto_watering(&self, poller: &PollerHandle) -> ControlResult<()> {
        let _guard = self.acquire()?;
        self.api.set_water_auto().await?;
        tracing::info!("automatic watering enabled");
        poller.refresh().await;
        Ok(())
    }

    /// Switches to manual mode by stopping the pump; never turns it on.
    pub async fn enable_manual_watering(&self, poller: &PollerHandle) -> ControlResult<()> {
        let _guard = self.acquire()?;
        self.api.stop_watering().await?;
        tracing::info!("manual watering enabled");
        poller.refresh().await;
        Ok(())
    }
}
