mod helpers;
mod mesh;
mod post;
mod renderer;
mod targets;

pub static SCENE_WGSL: &str = include_str!("../shaders/scene.wgsl");
pub static POST_WGSL: &str = include_str!("../shaders/post.wgsl");

pub use renderer::Renderer;
