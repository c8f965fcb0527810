use super::*;
use crate::device::{RawFormatKind, RawPixelFormat};
use crate::error::{CaptureError, LenslyError};
use crate::lens::{Lens, LensKind, LensPosition};
use std::time::Duration;
use tokio::sync::mpsc;

const BAYER: RawPixelFormat = RawPixelFormat {
    kind: RawFormatKind::Bayer,
    code: 0x6267_3130,
};
const PRORAW: RawPixelFormat = RawPixelFormat {
    kind: RawFormatKind::ProRaw,
    code: 0x6c36_3432,
};

fn back_lens() -> Lens {
    Lens::new("back-wide", LensPosition::Back, LensKind::Wide, 65.0)
}

fn front_lens() -> Lens {
    Lens::new("front-wide", LensPosition::Front, LensKind::Wide, 70.0)
}

fn settings(format: PhotoFormat, flash: FlashMode) -> CaptureSettings {
    CaptureSettings { format, flash }
}

#[test]
fn test_request_mirrors_only_front_lens() {
    let (front, _) = compose_request(&CaptureSettings::default(), &front_lens(), &[]);
    let (back, _) = compose_request(&CaptureSettings::default(), &back_lens(), &[]);

    assert!(front.mirrored);
    assert!(!back.mirrored);
    assert_eq!(back.lens, back_lens().id);
    assert_ne!(front.id, back.id);
}

#[test]
fn test_torch_fires_as_flash_for_single_capture() {
    let (request, _) = compose_request(
        &settings(PhotoFormat::Jpeg, FlashMode::Torch),
        &back_lens(),
        &[],
    );
    assert_eq!(request.flash, FlashMode::On);

    let (request, _) = compose_request(
        &settings(PhotoFormat::Jpeg, FlashMode::Off),
        &back_lens(),
        &[],
    );
    assert_eq!(request.flash, FlashMode::Off);
}

#[test]
fn test_raw_formats_resolved_by_kind() {
    let formats = [PRORAW, BAYER];

    let (raw, warning) = compose_request(
        &settings(PhotoFormat::Raw, FlashMode::Off),
        &back_lens(),
        &formats,
    );
    assert!(warning.is_none());
    assert_eq!(raw.format, PhotoFormat::Raw);
    assert_eq!(raw.raw_pixel_format, Some(BAYER));

    let (pro, warning) = compose_request(
        &settings(PhotoFormat::ProRaw, FlashMode::Off),
        &back_lens(),
        &formats,
    );
    assert!(warning.is_none());
    assert_eq!(pro.raw_pixel_format, Some(PRORAW));
}

#[test]
fn test_missing_raw_falls_back_to_default_format() {
    let (request, warning) = compose_request(
        &settings(PhotoFormat::ProRaw, FlashMode::Auto),
        &front_lens(),
        &[BAYER],
    );

    assert_eq!(request.format, PhotoFormat::Heif);
    assert_eq!(request.raw_pixel_format, None);
    assert!(matches!(
        warning,
        Some(CaptureError::NoRawFormatAvailable { .. })
    ));
}

#[test]
fn test_processed_formats_skip_raw_resolution() {
    let (request, warning) = compose_request(
        &settings(PhotoFormat::Heif, FlashMode::Auto),
        &back_lens(),
        &[BAYER],
    );
    assert!(warning.is_none());
    assert_eq!(request.raw_pixel_format, None);
}

#[test]
fn test_format_and_flash_cycles() {
    assert_eq!(PhotoFormat::ProRaw.next(), PhotoFormat::Heif);
    assert_eq!(FlashMode::Torch.next(), FlashMode::Auto);
    assert_eq!(PhotoFormat::ProRaw.to_string(), "RAW+");
    assert!(PhotoFormat::Raw.is_raw());
    assert!(!PhotoFormat::Jpeg.is_raw());
}

#[test]
fn test_format_and_flash_parsing() {
    assert_eq!("RAW+".parse::<PhotoFormat>(), Ok(PhotoFormat::ProRaw));
    assert_eq!("jpg".parse::<PhotoFormat>(), Ok(PhotoFormat::Jpeg));
    assert!("tiff".parse::<PhotoFormat>().is_err());
    assert_eq!("Torch".parse::<FlashMode>(), Ok(FlashMode::Torch));
    assert!("strobe".parse::<FlashMode>().is_err());
}

#[tokio::test]
async fn test_zero_delay_captures_immediately() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut sequencer = CaptureSequencer::new(Duration::from_secs(1), tx);

    assert_eq!(sequencer.start(0).unwrap(), SequencerStep::Capture);
    assert_eq!(sequencer.state(), SequencerState::Capturing);
    assert!(!sequencer.has_timer());

    sequencer.finish();
    assert_eq!(sequencer.state(), SequencerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_runs_through_zero_then_captures() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sequencer = CaptureSequencer::new(Duration::from_secs(1), tx);

    assert_eq!(sequencer.start(2).unwrap(), SequencerStep::Countdown(2));

    let mut steps = Vec::new();
    while let Some(tick) = rx.recv().await {
        let step = sequencer.on_tick(tick);
        steps.push(step);
        if step == Some(SequencerStep::Capture) {
            break;
        }
    }

    assert_eq!(
        steps,
        vec![
            Some(SequencerStep::Countdown(1)),
            Some(SequencerStep::Countdown(0)),
            Some(SequencerStep::Capture),
        ]
    );
    assert_eq!(sequencer.state(), SequencerState::Capturing);
    assert!(!sequencer.has_timer());
}

#[tokio::test(start_paused = true)]
async fn test_restart_cancels_prior_countdown() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sequencer = CaptureSequencer::new(Duration::from_secs(1), tx);

    sequencer.start(3).unwrap();
    assert_eq!(sequencer.start(0).unwrap(), SequencerStep::Capture);
    assert!(!sequencer.has_timer());

    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_ticks_from_replaced_timer_are_ignored() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut sequencer = CaptureSequencer::new(Duration::from_secs(60), tx);

    sequencer.start(3).unwrap();
    sequencer.start(2).unwrap();

    assert_eq!(sequencer.on_tick(CountdownTick { generation: 1 }), None);
    assert_eq!(
        sequencer.state(),
        SequencerState::CountdownActive { remaining: 2 }
    );
    assert_eq!(
        sequencer.on_tick(CountdownTick { generation: 2 }),
        Some(SequencerStep::Countdown(1))
    );
}

#[tokio::test]
async fn test_start_rejected_while_capturing() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut sequencer = CaptureSequencer::new(Duration::from_secs(1), tx);

    sequencer.start(0).unwrap();
    let result = sequencer.start(2);

    assert!(matches!(
        result,
        Err(LenslyError::CaptureInProgress { .. })
    ));
    assert_eq!(sequencer.state(), SequencerState::Capturing);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_returns_to_idle_without_ticks() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sequencer = CaptureSequencer::new(Duration::from_secs(1), tx);

    sequencer.start(5).unwrap();
    assert!(sequencer.cancel());
    assert_eq!(sequencer.state(), SequencerState::Idle);
    assert!(!sequencer.cancel());

    tokio::time::advance(Duration::from_secs(3)).await;
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
}
