use crate::device::{DeviceStatus, RoofStatus, RoofUpdate};

/// Roof card state.
///
/// `is_moving` is authoritative when the device reports it; otherwise a
/// `roof_status` of `moving` implies motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoofView {
    pub status: Option<RoofStatus>,
    pub moving: bool,
    pub raining: bool,
}

impl RoofView {
    pub fn from_status(status: &DeviceStatus) -> Self {
        let moving = status
            .is_moving
            .unwrap_or(status.roof_status == Some(RoofStatus::Moving));
        Self {
            status: status.roof_status,
            moving,
            raining: status.is_raining(),
        }
    }

    /// Folds in the roof position returned by a rain override.
    pub fn with_update(self, update: RoofUpdate) -> Self {
        Self {
            status: Some(update.roof_status),
            moving: update.roof_status == RoofStatus::Moving,
            ..self
        }
    }

    pub fn can_open(&self) -> bool {
        !self.moving && self.status != Some(RoofStatus::Open)
    }

    pub fn can_close(&self) -> bool {
        !self.moving && self.status != Some(RoofStatus::Closed)
    }

    pub fn summary(&self) -> String {
        let position = if self.moving {
            "moving..."
        } else {
            self.status.map_or("unknown", RoofStatus::label)
        };
        let weather = if self.raining { "raining" } else { "clear" };
        format!("Roof: {position}  Weather: {weather}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(roof_status: Option<RoofStatus>, is_moving: Option<bool>) -> DeviceStatus {
        DeviceStatus {
            roof_status,
            is_moving,
            ..DeviceStatus::default()
        }
    }

    #[test]
    fn moving_flag_takes_precedence_over_roof_status() {
        let view = RoofView::from_status(&status(Some(RoofStatus::Moving), Some(false)));
        assert!(!view.moving);

        let view = RoofView::from_status(&status(Some(RoofStatus::Open), Some(true)));
        assert!(view.moving);
    }

    #[test]
    fn roof_status_implies_motion_without_flag() {
        let view = RoofView::from_status(&status(Some(RoofStatus::Moving), None));
        assert!(view.moving);
        assert!(!view.can_open());
        assert!(!view.can_close());
        assert_eq!(view.summary(), "Roof: moving...  Weather: clear");
    }

    #[test]
    fn open_and_close_disabled_at_their_end_positions() {
        let open = RoofView::from_status(&status(Some(RoofStatus::Open), None));
        assert!(!open.can_open());
        assert!(open.can_close());

        let closed = RoofView::from_status(&status(Some(RoofStatus::Closed), None));
        assert!(closed.can_open());
        assert!(!closed.can_close());

        let partial = RoofView::from_status(&status(Some(RoofStatus::Partial), None));
        assert!(partial.can_open() && partial.can_close());
    }

    #[test]
    fn rain_override_response_updates_position() {
        let raining = DeviceStatus {
            rain: Some("rain".to_string()),
            ..status(Some(RoofStatus::Open), None)
        };
        let view = RoofView::from_status(&raining).with_update(RoofUpdate {
            roof_status: RoofStatus::Closed,
        });

        assert_eq!(view.status, Some(RoofStatus::Closed));
        assert!(view.raining);
        assert_eq!(view.summary(), "Roof: closed  Weather: raining");
    }
}
