// Host-side tests for the camera and the damped orbit controls.

use glam::Vec3;
use viewer_core::{Camera, OrbitControls};

#[test]
fn camera_matrices_are_sane() {
    let camera = Camera::new(16.0 / 9.0);
    let view_proj = camera.view_proj_matrix();
    // The look-at target projects into clip space in front of the camera.
    let clip = view_proj * camera.target.extend(1.0);
    assert!(clip.w > 0.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
}

#[test]
fn eye_points_down_positive_z_at_zero_angles() {
    let mut controls = OrbitControls::new();
    // Drive the orbit to known angles through the public interface by
    // reconstructing: a fresh control derives its angles from the default
    // eye, so instead verify the eye matches that default distance.
    let eye = controls.eye();
    assert!((eye.length() - controls.distance()).abs() < 1e-4);

    controls.update();
    let eye_after = controls.eye();
    assert!((eye - eye_after).length() < 1e-4, "no drift without input");
}

#[test]
fn distance_clamps_to_limits() {
    let mut controls = OrbitControls::new();
    for _ in 0..500 {
        controls.zoom(5.0);
        controls.update();
    }
    assert!(controls.distance() >= controls.min_distance - 1e-4);

    for _ in 0..500 {
        controls.zoom(-5.0);
        controls.update();
    }
    assert!(controls.distance() <= controls.max_distance + 1e-4);
}

#[test]
fn pitch_never_reaches_the_poles() {
    let mut controls = OrbitControls::new();
    for _ in 0..1000 {
        controls.rotate(0.0, 0.5);
        controls.update();
    }
    let eye = controls.eye();
    let horizontal = Vec3::new(eye.x, 0.0, eye.z).length();
    assert!(horizontal > 1e-4, "camera must stay off the pole");
}

#[test]
fn motion_glides_to_a_stop() {
    let mut controls = OrbitControls::new();
    controls.rotate(0.2, 0.0);
    let mut last_eye = controls.eye();
    let mut first_step = 0.0f32;
    for i in 0..400 {
        controls.update();
        let eye = controls.eye();
        let step = (eye - last_eye).length();
        if i == 0 {
            first_step = step;
        }
        last_eye = eye;
    }
    controls.update();
    let final_step = (controls.eye() - last_eye).length();
    assert!(first_step > 0.0);
    assert!(
        final_step < first_step * 1e-3,
        "residual motion {final_step} after damping"
    );
}

#[test]
fn apply_to_updates_camera_eye_and_target() {
    let mut controls = OrbitControls::new();
    let mut camera = Camera::new(1.0);
    controls.rotate(0.3, 0.1);
    controls.update();
    controls.apply_to(&mut camera);
    assert_eq!(camera.eye, controls.eye());
    assert_eq!(camera.target, Vec3::ZERO);
}
