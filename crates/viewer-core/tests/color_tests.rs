// Host-side tests for the HSL conversion used by both glow strategies.

use glam::Vec3;
use viewer_core::hsl_to_rgb;

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

#[test]
fn primary_hues_convert_exactly() {
    assert!(close(hsl_to_rgb(0.0, 1.0, 0.5), Vec3::new(1.0, 0.0, 0.0)));
    assert!(close(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), Vec3::new(0.0, 1.0, 0.0)));
    assert!(close(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), Vec3::new(0.0, 0.0, 1.0)));
}

#[test]
fn zero_saturation_is_grey() {
    assert!(close(hsl_to_rgb(0.37, 0.0, 0.25), Vec3::splat(0.25)));
}

#[test]
fn lightness_extremes_are_black_and_white() {
    assert!(close(hsl_to_rgb(0.6, 1.0, 0.0), Vec3::ZERO));
    assert!(close(hsl_to_rgb(0.6, 1.0, 1.0), Vec3::ONE));
}

#[test]
fn hue_wraps_around() {
    assert!(close(hsl_to_rgb(1.2, 1.0, 0.5), hsl_to_rgb(0.2, 1.0, 0.5)));
    assert!(close(hsl_to_rgb(-0.4, 1.0, 0.5), hsl_to_rgb(0.6, 1.0, 0.5)));
}

#[test]
fn channels_stay_in_unit_range() {
    for i in 0..=20 {
        let h = i as f32 / 20.0;
        let c = hsl_to_rgb(h, 1.0, 0.3);
        for v in c.to_array() {
            assert!((0.0..=1.0).contains(&v), "channel {v} out of range at hue {h}");
        }
    }
}
