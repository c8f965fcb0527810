mod interface;
mod types;

pub use interface::{
    CaptureBackend, CaptureDevice, DeviceDiscovery, Observation, ObservationSink, Observed,
};
pub use types::{
    DeviceCommand, DeviceFormat, ExposureDuration, ExposureMode, FocusMode, FocusPoint,
    HardwareReport, ModeChange, RawFormatKind, RawPixelFormat, WhiteBalanceGains,
    WhiteBalanceMode,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::LensId;
    use tokio::sync::mpsc;

    #[test]
    fn test_shutter_denominator_from_duration() {
        assert_eq!(ExposureDuration::new(1, 250).shutter_denominator(), 250);
        assert_eq!(ExposureDuration::new(10, 1000).shutter_denominator(), 100);
        // Zero-length durations are treated as one tick
        assert_eq!(ExposureDuration::new(0, 60).shutter_denominator(), 60);
        assert_eq!(
            ExposureDuration::from_shutter_denominator(500).shutter_denominator(),
            500
        );
    }

    #[test]
    fn test_focus_point_is_clamped() {
        let point = FocusPoint::new(1.5, -0.2);
        assert_eq!(point, FocusPoint { x: 1.0, y: 0.0 });
    }

    #[tokio::test]
    async fn test_sink_goes_stale_when_observation_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (sink, observation) = ObservationSink::register(LensId::new("wide"), tx);

        assert!(sink.report(HardwareReport::Iso(100.0)));
        let observed = rx.recv().await.unwrap();
        assert_eq!(observed.lens, LensId::new("wide"));
        assert_eq!(observed.report, HardwareReport::Iso(100.0));

        drop(observation);
        assert!(!sink.is_active());
        assert!(!sink.report(HardwareReport::Iso(200.0)));
        assert!(rx.try_recv().is_err());
    }
}
