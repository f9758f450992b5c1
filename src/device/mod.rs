mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod model;

use async_trait::async_trait;

pub use client::{latest_leaf_image_url, HttpDeviceClient};
pub use error::{DeviceError, DeviceResult};
pub use model::{
    ControlMode, DeviceStatus, ImageUpload, LeafAnalysisResponse, PumpStatus, RoofStatus,
    RoofUpdate, SoilState, RAIN_SENTINEL, UPLOAD_FILE_NAME,
};

/// Remote device HTTP API ("the Pi").
///
/// `HttpDeviceClient` is the production implementation; tests substitute
/// scripted fakes.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn status(&self) -> DeviceResult<DeviceStatus>;
    async fn upload_analyze(&self, image: &ImageUpload) -> DeviceResult<LeafAnalysisResponse>;
    async fn capture_analyze(&self) -> DeviceResult<LeafAnalysisResponse>;
    async fn set_rain_manual(&self, raining: bool) -> DeviceResult<RoofUpdate>;
    async fn set_rain_auto(&self) -> DeviceResult<RoofUpdate>;
    async fn start_watering(&self) -> DeviceResult<()>;
    async fn stop_watering(&self) -> DeviceResult<()>;
    async fn set_water_auto(&self) -> DeviceResult<()>;

    /// URL of the most recent leaf image stored on the device.
    fn latest_leaf_image_url(&self, cache_buster: u64) -> String;
}
