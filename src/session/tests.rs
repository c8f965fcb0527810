use super::*;
use crate::device::{
    DeviceCommand, DeviceDiscovery, ExposureDuration, ExposureMode, FocusMode, FocusPoint,
    ModeChange, Observed, WhiteBalanceMode,
};
use crate::error::DeviceError;
use crate::lens::{Lens, LensId};
use crate::simulated::{SimulatedCamera, BAYER_RAW_FORMAT, PRORAW_FORMAT};
use std::sync::Arc;
use tokio::sync::mpsc;

fn create_test_session() -> (
    Arc<SimulatedCamera>,
    CaptureSessionController,
    mpsc::UnboundedReceiver<Observed>,
) {
    let camera = Arc::new(SimulatedCamera::default_rig());
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = CaptureSessionController::new(camera.clone(), camera.clone(), tx);
    (camera, controller, rx)
}

fn lens(camera: &SimulatedCamera, id: &str) -> Lens {
    camera
        .list_lenses()
        .into_iter()
        .find(|lens| lens.id.as_str() == id)
        .unwrap()
}

#[test]
fn test_switch_lens_replaces_input() {
    let (camera, controller, mut rx) = create_test_session();

    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();

    assert_eq!(camera.input_ids(), vec![LensId::new("back-wide")]);
    assert_eq!(camera.commit_count(), 1);
    assert!(!camera.is_configuring());
    assert_eq!(controller.active_lens_id(), Some(LensId::new("back-wide")));

    // Initial values are pushed as soon as the device is observed
    let observed = rx.try_recv().unwrap();
    assert_eq!(observed.lens, LensId::new("back-wide"));
}

#[test]
fn test_switch_lens_moves_observation() {
    let (camera, controller, _rx) = create_test_session();

    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();
    controller.switch_lens(&lens(&camera, "back-telephoto")).unwrap();

    assert_eq!(camera.input_ids(), vec![LensId::new("back-telephoto")]);
    assert!(!camera.device("back-wide").unwrap().is_observed());
    assert!(camera.device("back-telephoto").unwrap().is_observed());
}

#[test]
fn test_failed_input_construction_changes_nothing() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();

    camera.fail_input("back-telephoto", true);
    let result = controller.switch_lens(&lens(&camera, "back-telephoto"));

    assert!(matches!(
        result,
        Err(DeviceError::InputConstruction { .. })
    ));
    assert_eq!(controller.active_lens_id(), Some(LensId::new("back-wide")));
    assert_eq!(camera.input_ids(), vec![LensId::new("back-wide")]);
    assert_eq!(camera.commit_count(), 1);
    assert!(camera.device("back-wide").unwrap().is_observed());
}

#[test]
fn test_write_without_active_device() {
    let (_camera, controller, _rx) = create_test_session();

    assert_eq!(
        controller.apply_exposure_bias(1.0),
        Err(DeviceError::NoActiveDevice)
    );
    assert!(controller.active_lens().is_none());
}

#[test]
fn test_write_locks_and_unlocks() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();
    let device = camera.device("back-wide").unwrap();

    controller.apply_exposure_bias(1.5).unwrap();

    assert_eq!(device.lock_count(), 1);
    assert_eq!(device.unlock_count(), 1);
    assert!(!device.is_locked());
    assert_eq!(device.state().exposure_bias, 1.5);
}

#[test]
fn test_failed_write_still_unlocks() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();
    let device = camera.device("back-wide").unwrap();
    device.fail_property(Some("exposure_bias"));

    let result = controller.apply_exposure_bias(2.0);

    assert!(matches!(result, Err(DeviceError::PropertyWrite { .. })));
    assert_eq!(device.lock_count(), device.unlock_count());
    assert!(!device.is_locked());
    assert_eq!(device.state().exposure_bias, 0.0);
}

#[test]
fn test_lock_failure_aborts_write() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();
    let device = camera.device("back-wide").unwrap();
    device.fail_lock(true);

    let result = controller.apply_white_balance_temperature(4000.0);

    assert!(matches!(
        result,
        Err(DeviceError::ConfigurationLock { .. })
    ));
    assert!(device.writes().is_empty());
    assert_eq!(device.unlock_count(), 0);
}

#[test]
fn test_focus_point_sets_both_subsystems() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();
    let device = camera.device("back-wide").unwrap();
    let point = FocusPoint::new(0.25, 0.75);

    controller.apply_focus_point(point).unwrap();

    let state = device.state();
    assert_eq!(state.focus_point, Some(point));
    assert_eq!(state.exposure_point, Some(point));
    assert_eq!(state.focus_mode, FocusMode::AutoFocus);
    assert_eq!(state.exposure_mode, ExposureMode::AutoExpose);
    assert_eq!(device.lock_count(), 1);
}

#[test]
fn test_fixed_focus_lens() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "front-wide")).unwrap();
    let device = camera.device("front-wide").unwrap();

    controller
        .apply_mode_change(ModeChange::Focus(FocusMode::ContinuousAuto))
        .unwrap();
    assert!(device.writes().is_empty());

    assert!(matches!(
        controller.apply_focus(0.3),
        Err(DeviceError::Unsupported { .. })
    ));

    controller.apply_focus_point(FocusPoint::center()).unwrap();
    let state = device.state();
    assert_eq!(state.focus_point, None);
    assert_eq!(state.exposure_mode, ExposureMode::AutoExpose);
}

#[test]
fn test_custom_exposure_write() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();

    controller.apply_iso_and_shutter(400.0, 250).unwrap();

    let state = camera.device("back-wide").unwrap().state();
    assert_eq!(state.exposure_mode, ExposureMode::Custom);
    assert_eq!(state.iso, 400.0);
    assert_eq!(state.exposure_duration, ExposureDuration::new(1, 250));
}

#[test]
fn test_white_balance_temperature_locks_gains() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();

    controller.apply_white_balance_temperature(5000.0).unwrap();

    let state = camera.device("back-wide").unwrap().state();
    assert_eq!(state.white_balance_mode, WhiteBalanceMode::Locked);
    let kelvin = controller.temperature_for_gains(state.gains).unwrap();
    assert!((kelvin - 5000.0).abs() < 0.5);
}

#[test]
fn test_concurrent_writes_are_serialized() {
    let (camera, controller, _rx) = create_test_session();
    controller.switch_lens(&lens(&camera, "back-wide")).unwrap();
    let controller = Arc::new(controller);

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let controller = Arc::clone(&controller);
            scope.spawn(move || {
                for i in 0..50 {
                    let command = if (worker + i) % 2 == 0 {
                        DeviceCommand::ExposureBias(0.5)
                    } else {
                        DeviceCommand::WhiteBalanceTemperature(5200.0)
                    };
                    controller.execute(&command).unwrap();
                }
            });
        }
    });

    let device = camera.device("back-wide").unwrap();
    assert_eq!(device.lock_count(), 400);
    assert_eq!(device.unlock_count(), 400);
    assert_eq!(device.writes().len(), 400);
}

#[tokio::test]
async fn test_executor_runs_writes_in_background() {
    let (camera, controller, _rx) = create_test_session();
    let executor = SessionExecutor::new(Arc::new(controller));

    executor.switch_lens(lens(&camera, "back-wide")).await.unwrap();
    executor
        .write(DeviceCommand::LensPosition(0.8))
        .await
        .unwrap();

    let state = camera.device("back-wide").unwrap().state();
    assert_eq!(state.focus_mode, FocusMode::Locked);
    assert_eq!(state.lens_position, 0.8);
}

#[tokio::test]
async fn test_raw_formats_follow_active_lens() {
    let (camera, controller, _rx) = create_test_session();
    let executor = SessionExecutor::new(Arc::new(controller));

    executor.switch_lens(lens(&camera, "back-wide")).await.unwrap();
    assert_eq!(
        executor.available_raw_formats().await,
        vec![BAYER_RAW_FORMAT, PRORAW_FORMAT]
    );

    executor.switch_lens(lens(&camera, "front-wide")).await.unwrap();
    assert!(executor.available_raw_formats().await.is_empty());
}
