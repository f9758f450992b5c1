use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    DeviceApi, DeviceError, DeviceResult, DeviceStatus, ImageUpload, LeafAnalysisResponse,
    RoofStatus, RoofUpdate,
};

pub(crate) const FAKE_BASE_URL: &str = "http://pi.test:8000";

/// Scripted device used by unit tests. Each queue pops one response per call;
/// an exhausted status or analysis queue answers with HTTP 503.
#[derive(Default)]
pub(crate) struct FakeDeviceApi {
    statuses: Mutex<VecDeque<(Option<Duration>, DeviceResult<DeviceStatus>)>>,
    analyses: Mutex<VecDeque<DeviceResult<LeafAnalysisResponse>>>,
    status_delay: Option<Duration>,
    roof: Mutex<Option<RoofStatus>>,
    calls: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
}

impl FakeDeviceApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(crate) fn push_status(&self, status: DeviceResult<DeviceStatus>) {
        self.statuses.lock().unwrap().push_back((None, status));
    }

    /// Queues a response that takes `delay` to arrive, overriding `with_status_delay`.
    pub(crate) fn push_delayed_status(&self, delay: Duration, status: DeviceResult<DeviceStatus>) {
        self.statuses.lock().unwrap().push_back((Some(delay), status));
    }

    pub(crate) fn push_analysis(&self, analysis: DeviceResult<LeafAnalysisResponse>) {
        self.analyses.lock().unwrap().push_back(analysis);
    }

    pub(crate) fn set_roof(&self, roof: RoofStatus) {
        *self.roof.lock().unwrap() = Some(roof);
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn unavailable(endpoint: &str) -> DeviceError {
        DeviceError::Status {
            endpoint: format!("{FAKE_BASE_URL}{endpoint}"),
            status: 503,
        }
    }

    fn roof_update(&self) -> DeviceResult<RoofUpdate> {
        self.roof
            .lock()
            .unwrap()
            .map(|roof_status| RoofUpdate { roof_status })
            .ok_or_else(|| Self::unavailable("/rain"))
    }

    fn next_analysis(&self) -> DeviceResult<LeafAnalysisResponse> {
        self.analyses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::unavailable("/upload-analyze")))
    }
}

pub(crate) fn analysis(label: &str, confidence: f64, healthy: bool) -> LeafAnalysisResponse {
    LeafAnalysisResponse {
        prediction_label: label.to_string(),
        confidence,
        healthy,
    }
}

#[async_trait]
impl DeviceApi for FakeDeviceApi {
    async fn status(&self) -> DeviceResult<DeviceStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        let (delay, outcome) =
            next.unwrap_or_else(|| (None, Err(Self::unavailable("/status"))));
        if let Some(delay) = delay.or(self.status_delay) {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn upload_analyze(&self, image: &ImageUpload) -> DeviceResult<LeafAnalysisResponse> {
        self.record(format!("upload-analyze {}", image.file_name));
        self.next_analysis()
    }

    async fn capture_analyze(&self) -> DeviceResult<LeafAnalysisResponse> {
        self.record("capture-analyze");
        self.next_analysis()
    }

    async fn set_rain_manual(&self, raining: bool) -> DeviceResult<RoofUpdate> {
        self.record(format!("rain manual {}", u8::from(raining)));
        self.roof_update()
    }

    async fn set_rain_auto(&self) -> DeviceResult<RoofUpdate> {
        self.record("rain auto");
        self.roof_update()
    }

    async fn start_watering(&self) -> DeviceResult<()> {
        self.record("water manual start");
        Ok(())
    }

    async fn stop_watering(&self) -> DeviceResult<()> {
        self.record("water manual stop");
        Ok(())
    }

    async fn set_water_auto(&self) -> DeviceResult<()> {
        self.record("water auto");
        Ok(())
    }

    fn latest_leaf_image_url(&self, cache_buster: u64) -> String {
        super::latest_leaf_image_url(FAKE_BASE_URL, cache_buster)
    }
}
