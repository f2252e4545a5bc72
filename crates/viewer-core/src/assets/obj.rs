//! Wavefront OBJ parsing.

use glam::Vec3;

use crate::error::AssetError;
use crate::scene::Geometry;

/// One `o`/`g` block of an OBJ file, flattened to indexed triangles.
#[derive(Debug, Default)]
pub struct ObjObject {
    pub name: String,
    pub geometry: Geometry,
    /// Material names in the order their `usemtl` statements appeared.
    pub material_names: Vec<String>,
}

/// Names referenced by `mtllib` statements, in file order.
pub fn mtllib_names(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("mtllib "))
        .map(|rest| rest.trim().to_string())
        .collect()
}

/// Parse OBJ content into per-object geometry.
///
/// Vertex attributes are indexed globally per the OBJ format; faces are
/// fan-triangulated. Missing normals are replaced with the flat face normal.
pub fn parse_objects(content: &str) -> Result<Vec<ObjObject>, AssetError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut objects: Vec<ObjObject> = Vec::new();

    for (line_number, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" => {
                if parts.len() >= 4 {
                    positions.push(parse_vec3(&parts[1..4], line_number)?);
                }
            }
            "vn" => {
                if parts.len() >= 4 {
                    normals.push(parse_vec3(&parts[1..4], line_number)?);
                }
            }
            "o" | "g" => {
                let name = if parts.len() > 1 {
                    parts[1..].join(" ")
                } else {
                    format!("object_{}", objects.len())
                };
                objects.push(ObjObject {
                    name,
                    ..ObjObject::default()
                });
            }
            "usemtl" => {
                if parts.len() > 1 {
                    let object = current_object(&mut objects);
                    let name = parts[1].to_string();
                    if !object.material_names.contains(&name) {
                        object.material_names.push(name);
                    }
                }
            }
            "f" => {
                if parts.len() >= 4 {
                    let corners = parse_face_corners(&parts[1..], line_number)?;
                    let object = current_object(&mut objects);
                    emit_triangles(object, &corners, &positions, &normals, line_number)?;
                }
            }
            // mtllib handled separately; everything else is ignored.
            _ => {}
        }
    }

    Ok(objects)
}

fn current_object(objects: &mut Vec<ObjObject>) -> &mut ObjObject {
    if objects.is_empty() {
        objects.push(ObjObject {
            name: "default".to_string(),
            ..ObjObject::default()
        });
    }
    objects.last_mut().expect("objects is non-empty")
}

fn parse_vec3(parts: &[&str], line_number: usize) -> Result<[f32; 3], AssetError> {
    let mut out = [0.0f32; 3];
    for (slot, token) in out.iter_mut().zip(parts) {
        *slot = token.parse().map_err(|_| {
            AssetError::Parse(format!("invalid float '{token}' on line {}", line_number + 1))
        })?;
    }
    Ok(out)
}

/// One face corner: position index plus optional normal index (0-based).
struct FaceCorner {
    position: usize,
    normal: Option<usize>,
}

fn parse_face_corners(tokens: &[&str], line_number: usize) -> Result<Vec<FaceCorner>, AssetError> {
    let mut corners = Vec::with_capacity(tokens.len());
    for token in tokens {
        let mut fields = token.split('/');
        let position = fields
            .next()
            .and_then(|f| f.parse::<usize>().ok())
            .and_then(|i| i.checked_sub(1))
            .ok_or_else(|| {
                AssetError::Parse(format!(
                    "invalid face index '{token}' on line {}",
                    line_number + 1
                ))
            })?;
        let _texcoord = fields.next();
        let normal = fields
            .next()
            .filter(|f| !f.is_empty())
            .and_then(|f| f.parse::<usize>().ok())
            .and_then(|i| i.checked_sub(1));
        corners.push(FaceCorner { position, normal });
    }
    Ok(corners)
}

fn emit_triangles(
    object: &mut ObjObject,
    corners: &[FaceCorner],
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    line_number: usize,
) -> Result<(), AssetError> {
    for i in 1..corners.len() - 1 {
        let triangle = [&corners[0], &corners[i], &corners[i + 1]];
        let mut corner_positions = [[0.0f32; 3]; 3];
        for (slot, corner) in corner_positions.iter_mut().zip(&triangle) {
            *slot = *positions.get(corner.position).ok_or_else(|| {
                AssetError::Parse(format!(
                    "position index out of bounds on line {}",
                    line_number + 1
                ))
            })?;
        }
        let face_normal = flat_normal(&corner_positions);
        for (corner, position) in triangle.iter().zip(corner_positions) {
            let normal = corner
                .normal
                .and_then(|i| normals.get(i))
                .copied()
                .unwrap_or(face_normal);
            let index = object.geometry.positions.len() as u32;
            object.geometry.positions.push(position);
            object.geometry.normals.push(normal);
            object.geometry.indices.push(index);
        }
    }
    Ok(())
}

fn flat_normal(corners: &[[f32; 3]; 3]) -> [f32; 3] {
    let a = Vec3::from(corners[0]);
    let b = Vec3::from(corners[1]);
    let c = Vec3::from(corners[2]);
    let n = (b - a).cross(c - a);
    if n.length_squared() > 0.0 {
        n.normalize().to_array()
    } else {
        [0.0, 1.0, 0.0]
    }
}
