// Shared effect/scene tuning constants used by the render and native frontends.

// Glow defaults (matches the original tuning of the effect)
pub const DEFAULT_GLOW_INTENSITY: f32 = 2.0;
pub const DEFAULT_GLOW_HUE: f32 = 0.6;
pub const DEFAULT_PULSE_SPEED: f32 = 2.0;
pub const DEFAULT_PULSE_INTENSITY: f32 = 1.0;
pub const GLOW_SHELL_SCALE: f32 = 1.02; // outward scale of a shell mesh
pub const GLOW_SHELL_OPACITY: f32 = 0.6; // idle shell translucency

// Bloom defaults
pub const DEFAULT_EXPOSURE: f32 = 1.0;
pub const DEFAULT_BLOOM_STRENGTH: f32 = 1.5;
pub const DEFAULT_BLOOM_THRESHOLD: f32 = 0.1;
pub const DEFAULT_BLOOM_RADIUS: f32 = 0.4;

// Camera and orbit controls
pub const CAMERA_FOV_DEGREES: f32 = 50.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;
pub const DEFAULT_CAMERA_EYE: [f32; 3] = [-5.0, -1.0, -8.0];
pub const ORBIT_DAMPING: f32 = 0.05; // per-update velocity decay factor
pub const ORBIT_MIN_DISTANCE: f32 = 1.0;
pub const ORBIT_MAX_DISTANCE: f32 = 10.0;

// A loaded model is recentered and scaled so its largest dimension matches this.
pub const MODEL_TARGET_SIZE: f32 = 2.0;

// Materials more opaque than this never pass the transparency glow heuristic.
pub const GLOW_OPACITY_CUTOFF: f32 = 0.9;
