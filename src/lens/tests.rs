use super::*;

fn back_wide() -> Lens {
    Lens::new("back-wide", LensPosition::Back, LensKind::Wide, 60.0)
}

fn back_tele() -> Lens {
    Lens::new("back-tele", LensPosition::Back, LensKind::Telephoto, 20.0)
}

fn front_wide() -> Lens {
    Lens::new("front-wide", LensPosition::Front, LensKind::Wide, 70.0)
}

#[test]
fn test_equivalent_focal_length() {
    // 90 degrees spans exactly twice the focal length
    let focal = equivalent_focal_length(90.0);
    assert!((focal - 17.5).abs() < 1e-4);
}

#[test]
fn test_reference_lens_maps_to_one() {
    let map = normalize(&[back_wide(), back_tele()]);

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&back_wide().id), Some(RelativeZoomFactor::new(1.0)));
}

#[test]
fn test_telephoto_follows_tan_ratio() {
    let map = normalize(&[back_wide(), back_tele()]);

    let expected = (30f32.to_radians().tan() / 10f32.to_radians().tan()).round();
    let tele = map.get(&back_tele().id).unwrap();
    assert!(tele.value() > 1.0);
    assert_eq!(tele.value(), expected);
    assert_eq!(tele.value(), 3.0);
}

#[test]
fn test_normalize_is_idempotent() {
    let lenses = vec![back_wide(), back_tele(), front_wide()];
    assert_eq!(normalize(&lenses), normalize(&lenses));
}

#[test]
fn test_no_reference_lens_yields_empty_map() {
    assert!(normalize(&[front_wide(), back_tele()]).is_empty());
    assert!(normalize(&[]).is_empty());
}

#[test]
fn test_ultra_wide_rounds_to_nearest() {
    let ultra = Lens::new("back-ultra", LensPosition::Back, LensKind::UltraWide, 120.0);
    let map = normalize(&[back_wide(), ultra.clone()]);

    assert_eq!(map.get(&ultra.id), Some(RelativeZoomFactor::new(0.0)));
}

#[test]
fn test_selectable_sorted_by_zoom() {
    let map = normalize(&[back_tele(), front_wide(), back_wide()]);

    let back: Vec<&str> = map
        .selectable(LensPosition::Back)
        .iter()
        .map(|entry| entry.lens.id.as_str())
        .collect();
    assert_eq!(back, vec!["back-wide", "back-tele"]);

    let front = map.selectable(LensPosition::Front);
    assert_eq!(front.len(), 1);
}

#[test]
fn test_zoom_labels() {
    assert_eq!(RelativeZoomFactor::new(2.0).label(), "2x");
    assert_eq!(RelativeZoomFactor::new(0.5).label(), "0.5x");
    assert_eq!(RelativeZoomFactor::new(1.0).to_string(), "1x");
}

#[test]
fn test_lens_position_opposite() {
    assert_eq!(LensPosition::Front.opposite(), LensPosition::Back);
    assert_eq!(LensPosition::Back.opposite(), LensPosition::Front);
    assert!(back_wide().is_reference());
    assert!(!front_wide().is_reference());
    assert!(front_wide().is_front());
}
