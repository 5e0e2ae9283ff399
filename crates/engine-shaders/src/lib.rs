//! engine-shaders: WGSL shader sources for the underlay passes.

/// Lit scene pass: vertices arrive in render space (frame + local transforms already applied)
/// and are projected by the default perspective camera.
pub const SCENE_WGSL: &str = r#"
struct SceneUniform {
    view_proj: mat4x4<f32>,
    light_dir: vec4<f32>,  // xyz: direction towards the light
    params: vec4<f32>,     // x: lighting enabled (0/1), y: ambient term
};

@group(0) @binding(0) var<uniform> scene: SceneUniform;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) in_pos: vec3<f32>,
    @location(1) in_normal: vec3<f32>,
    @location(2) in_color: vec4<f32>,
) -> VsOut {
    var out: VsOut;
    out.pos = scene.view_proj * vec4<f32>(in_pos, 1.0);
    out.color = in_color; // premultiplied linear color
    out.normal = in_normal;
    return out;
}

@fragment
fn fs_main(inp: VsOut) -> @location(0) vec4<f32> {
    if (scene.params.x < 0.5 || dot(inp.normal, inp.normal) < 1e-6) {
        return inp.color;
    }
    // Two-sided diffuse: walls are visible from either side.
    let n = normalize(inp.normal);
    let diffuse = abs(dot(n, normalize(scene.light_dir.xyz)));
    let shade = clamp(scene.params.y + (1.0 - scene.params.y) * diffuse, 0.0, 1.0);
    return vec4<f32>(inp.color.rgb * shade, inp.color.a);
}
"#;

/// Fullscreen triangle used by the fog composite.
pub const FOG_VERT_WGSL: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    var pos = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 3.0, -1.0),
        vec2<f32>(-1.0,  3.0),
    );
    return vec4<f32>(pos[vi], 0.0, 1.0);
}
"#;

/// Depth-aware fog composite. Reads the offscreen color and depth attachments texel-for-texel and
/// blends the scene toward the fog tone as linear depth approaches the far plane.
pub const FOG_FRAG_WGSL: &str = r#"
struct FogUniform {
    fog: vec4<f32>,    // rgb background tone, a unused
    depth: vec4<f32>,  // near, far, fog start, fog end (eye-space distances)
};

@group(0) @binding(0) var<uniform> params: FogUniform;
@group(0) @binding(1) var color_buffer: texture_2d<f32>;
@group(0) @binding(2) var depth_buffer: texture_depth_2d;

fn linear_depth(d: f32) -> f32 {
    let near = params.depth.x;
    let far = params.depth.y;
    return near * far / max(1e-6, far - d * (far - near));
}

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let texel = vec2<i32>(floor(frag.xy));
    let c = textureLoad(color_buffer, texel, 0);
    let d = textureLoad(depth_buffer, texel, 0);
    // Premultiplied scene over the fog tone.
    let scene = c.rgb + params.fog.rgb * (1.0 - c.a);
    let span = max(1e-6, params.depth.w - params.depth.z);
    let t = clamp((linear_depth(d) - params.depth.z) / span, 0.0, 1.0);
    return vec4<f32>(mix(scene, params.fog.rgb, t), 1.0);
}
"#;

/// A vertex + fragment source pair as handed to `RenderBackend::compile_program`.
#[derive(Clone, Copy, Debug)]
pub struct ShaderSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// Source pair for the fog composite program.
pub const FOG_SHADER: ShaderSource<'static> = ShaderSource {
    label: "fog-composite",
    vertex: FOG_VERT_WGSL,
    fragment: FOG_FRAG_WGSL,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fog_program_declares_its_bindings() {
        assert!(FOG_SHADER.fragment.contains("var color_buffer"));
        assert!(FOG_SHADER.fragment.contains("var depth_buffer"));
        assert!(FOG_SHADER.vertex.contains("fn vs_main"));
        assert!(FOG_SHADER.fragment.contains("fn fs_main"));
    }
}
