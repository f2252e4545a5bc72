//! Wavefront MTL parsing.
//!
//! Only the fields the effect heuristics care about are kept: diffuse color,
//! emission, and dissolve. Malformed statements are skipped with a log line
//! rather than failing the whole library.

use fnv::FnvHashMap;
use glam::Vec3;

use crate::scene::Material;

/// Parse MTL content into a name -> material map.
pub fn parse_materials(content: &str) -> FnvHashMap<String, Material> {
    let mut materials = FnvHashMap::default();
    let mut current: Option<Material> = None;

    for (line_number, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else { continue };
        let rest: Vec<&str> = tokens.collect();

        match command {
            "newmtl" => {
                if let Some(finished) = current.take() {
                    materials.insert(finished.name.clone(), finished);
                }
                current = Some(Material {
                    name: rest.first().unwrap_or(&"unnamed").to_string(),
                    ..Material::default()
                });
            }
            "Kd" => {
                if let (Some(material), Some(color)) =
                    (current.as_mut(), parse_color(&rest, line_number))
                {
                    material.base_color = color;
                }
            }
            "Ke" => {
                if let (Some(material), Some(color)) =
                    (current.as_mut(), parse_color(&rest, line_number))
                {
                    material.emissive = color;
                    material.emissive_intensity = if color != Vec3::ZERO { 1.0 } else { 0.0 };
                }
            }
            "d" => {
                if let (Some(material), Some(value)) = (current.as_mut(), parse_scalar(&rest)) {
                    material.opacity = value.clamp(0.0, 1.0);
                    material.transparent = material.opacity < 1.0;
                }
            }
            "Tr" => {
                // Inverted dissolve, used by some exporters.
                if let (Some(material), Some(value)) = (current.as_mut(), parse_scalar(&rest)) {
                    material.opacity = (1.0 - value).clamp(0.0, 1.0);
                    material.transparent = material.opacity < 1.0;
                }
            }
            _ => {}
        }
    }

    if let Some(finished) = current.take() {
        materials.insert(finished.name.clone(), finished);
    }
    materials
}

fn parse_color(tokens: &[&str], line_number: usize) -> Option<Vec3> {
    if tokens.len() < 3 {
        log::warn!("short color statement on MTL line {}", line_number + 1);
        return None;
    }
    let mut channels = [0.0f32; 3];
    for (slot, token) in channels.iter_mut().zip(tokens) {
        *slot = match token.parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("invalid color value '{token}' on MTL line {}", line_number + 1);
                return None;
            }
        };
    }
    Some(Vec3::from(channels))
}

fn parse_scalar(tokens: &[&str]) -> Option<f32> {
    tokens.first().and_then(|t| t.parse().ok())
}
