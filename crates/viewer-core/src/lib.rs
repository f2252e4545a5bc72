pub mod assets;
pub mod bloom;
pub mod camera;
pub mod color;
pub mod constants;
pub mod error;
pub mod glow;
pub mod layers;
pub mod scene;
pub mod selector;
pub mod transparency;

pub use assets::*;
pub use bloom::*;
pub use camera::*;
pub use color::*;
pub use constants::*;
pub use error::*;
pub use glow::*;
pub use layers::*;
pub use scene::*;
pub use selector::*;
pub use transparency::*;
