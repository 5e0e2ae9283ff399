use bytemuck::{Pod, Zeroable};

use crate::allocator::{BufKey, OwnedBuffer, RenderAllocator};
use crate::display_list::{DisplayList, ShapeCommand};
use crate::scene::{ColorLinPremul, EndShape};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// Render-space geometry for one display list: filled triangles, then stroke ribbons.
///
/// Both lists are triangle lists; strokes are drawn after fills so outlines sit on top at equal
/// depth.
#[derive(Clone, Debug, Default)]
pub struct SceneMesh {
    pub triangles: Vec<SceneVertex>,
    pub strokes: Vec<SceneVertex>,
}

pub struct GpuScene {
    pub triangles: Option<OwnedBuffer>,
    pub strokes: Option<OwnedBuffer>,
    pub triangle_vertices: u32,
    pub stroke_vertices: u32,
}

impl GpuScene {
    pub fn release(self, allocator: &mut RenderAllocator) {
        if let Some(buf) = self.triangles {
            allocator.release_buffer(buf);
        }
        if let Some(buf) = self.strokes {
            allocator.release_buffer(buf);
        }
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn offset(p: [f32; 3], d: [f32; 3], k: f32) -> [f32; 3] {
    [p[0] + d[0] * k, p[1] + d[1] * k, p[2] + d[2] * k]
}

/// Half-width offset for a ribbon along `dir`, perpendicular to it and to the view axis (+z).
/// Segments running along the view axis fall back to the x axis.
fn ribbon_side(dir: [f32; 3], half_width: f32) -> [f32; 3] {
    let side = [dir[1], -dir[0], 0.0];
    let len = (side[0] * side[0] + side[1] * side[1]).sqrt();
    if len > f32::EPSILON {
        [side[0] / len * half_width, side[1] / len * half_width, 0.0]
    } else {
        [half_width, 0.0, 0.0]
    }
}

/// Expand the segment `a`..`b` into a quad `weight` render units wide (two triangles).
fn push_ribbon(
    out: &mut Vec<SceneVertex>,
    (a, color_a): ([f32; 3], [f32; 4]),
    (b, color_b): ([f32; 3], [f32; 4]),
    weight: f32,
) {
    let dir = sub(b, a);
    if dir.iter().all(|c| c.abs() <= f32::EPSILON) {
        return;
    }
    let side = ribbon_side(dir, weight * 0.5);
    let vertex = |pos, color| SceneVertex { pos, normal: [0.0; 3], color };
    let (a_lo, a_hi) = (offset(a, side, -1.0), offset(a, side, 1.0));
    let (b_lo, b_hi) = (offset(b, side, -1.0), offset(b, side, 1.0));
    out.extend([
        vertex(a_lo, color_a),
        vertex(a_hi, color_a),
        vertex(b_hi, color_b),
        vertex(a_lo, color_a),
        vertex(b_hi, color_b),
        vertex(b_lo, color_b),
    ]);
}

/// Newell's method; returns a zero vector for degenerate polygons.
fn polygon_normal(points: &[[f32; 3]]) -> [f32; 3] {
    let mut n = [0.0f32; 3];
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n[0] += (a[1] - b[1]) * (a[2] + b[2]);
        n[1] += (a[2] - b[2]) * (a[0] + b[0]);
        n[2] += (a[0] - b[0]) * (a[1] + b[1]);
    }
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > f32::EPSILON {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0; 3]
    }
}

fn push_shape(mesh: &mut SceneMesh, shape: &ShapeCommand) {
    let points: Vec<[f32; 3]> = shape
        .vertices
        .iter()
        .map(|v| shape.transform.transform_point(v.pos))
        .collect();

    // Fill as a triangle fan; outlines handed to us are convex or close to it.
    if let Some(fill) = shape.style.fill {
        if points.len() >= 3 {
            let normal = polygon_normal(&points);
            let color = fill.to_array();
            for i in 1..points.len() - 1 {
                for p in [points[0], points[i], points[i + 1]] {
                    mesh.triangles.push(SceneVertex { pos: p, normal, color });
                }
            }
        }
    }

    let weight = shape.style.stroke_weight;
    if shape.style.stroke.is_none() || points.len() < 2 || weight.is_nan() || weight <= 0.0 {
        return;
    }
    let stroke_of = |i: usize| -> [f32; 4] {
        shape.vertices[i]
            .stroke
            .or(shape.style.stroke)
            .unwrap_or(ColorLinPremul::default())
            .to_array()
    };
    let mut edges: Vec<(usize, usize)> = (0..points.len() - 1).map(|i| (i, i + 1)).collect();
    if shape.end == EndShape::Close && points.len() > 2 {
        edges.push((points.len() - 1, 0));
    }
    for (a, b) in edges {
        push_ribbon(
            &mut mesh.strokes,
            (points[a], stroke_of(a)),
            (points[b], stroke_of(b)),
            weight,
        );
    }
}

/// Flatten a display list into render-space fill triangles and stroke ribbons.
pub fn tessellate_display_list(list: &DisplayList) -> SceneMesh {
    let mut mesh = SceneMesh::default();
    for shape in list.shapes() {
        push_shape(&mut mesh, shape);
    }
    mesh
}

fn upload_vertices(
    allocator: &mut RenderAllocator,
    queue: &wgpu::Queue,
    vertices: &[SceneVertex],
) -> Option<OwnedBuffer> {
    if vertices.is_empty() {
        return None;
    }
    let size = std::mem::size_of_val(vertices) as u64;
    // Round up so pooled buffers get reused across frames with similar geometry.
    let size = size.next_power_of_two().max(256);
    let buf = allocator.allocate_buffer(BufKey {
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    queue.write_buffer(&buf.buffer, 0, bytemuck::cast_slice(vertices));
    Some(buf)
}

/// Tessellate and upload a display list into pooled vertex buffers.
pub fn upload_display_list(
    allocator: &mut RenderAllocator,
    queue: &wgpu::Queue,
    list: &DisplayList,
) -> GpuScene {
    let mesh = tessellate_display_list(list);
    GpuScene {
        triangles: upload_vertices(allocator, queue, &mesh.triangles),
        strokes: upload_vertices(allocator, queue, &mesh.strokes),
        triangle_vertices: mesh.triangles.len() as u32,
        stroke_vertices: mesh.strokes.len() as u32,
    }
}
