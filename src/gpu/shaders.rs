//! WGSL sources for the scene pipelines.
//!
//! Both pipelines share bind group 0, the per-frame [`SCENE_BLOCK`]. Group 1
//! holds the per-draw material. Light slot 0 is the sun; slots 1 and 2 are
//! filled by the reveal.

/// Per-frame scene block, fog and lighting helpers.
pub const SCENE_BLOCK: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    // rgb colour, a = density
    fog: vec4<f32>,
    ambient: vec4<f32>,
    // xyz position, w = range (<= 0 for directional)
    light_pos: array<vec4<f32>, 3>,
    // rgb * intensity
    light_color: array<vec4<f32>, 3>,
};

@group(0) @binding(0) var<uniform> scene: Scene;

fn apply_fog(color: vec3<f32>, world: vec3<f32>) -> vec3<f32> {
    let dist = distance(world, scene.camera_pos.xyz);
    let density = scene.fog.a;
    let factor = 1.0 - exp(-density * density * dist * dist);
    return mix(color, scene.fog.rgb, clamp(factor, 0.0, 1.0));
}

fn lighting(world: vec3<f32>, normal: vec3<f32>) -> vec3<f32> {
    var total = scene.ambient.rgb;
    for (var i = 0u; i < 3u; i = i + 1u) {
        let to_light = scene.light_pos[i].xyz - world;
        let dist = max(length(to_light), 0.0001);
        let reach = scene.light_pos[i].w;
        // Non-positive reach marks a directional light
        var falloff = 1.0;
        if (reach > 0.0) {
            falloff = clamp(1.0 - dist / reach, 0.0, 1.0) / max(dist * dist, 1.0);
        }
        let diffuse = abs(dot(normal, to_light / dist));
        total = total + scene.light_color[i].rgb * diffuse * falloff;
    }
    return total;
}
"#;

/// Instanced textured quads: field, petals, model and label.
pub const MESH_BODY: &str = r#"
struct Material {
    // rgb tint, a = opacity
    tint: vec4<f32>,
    // rgb emissive, a = 1 when lit
    emissive: vec4<f32>,
    // x = alpha test
    params: vec4<f32>,
};

@group(1) @binding(0) var<uniform> material: Material;
@group(1) @binding(1) var base_texture: texture_2d<f32>;
@group(1) @binding(2) var base_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct InstanceInput {
    @location(3) m0: vec4<f32>,
    @location(4) m1: vec4<f32>,
    @location(5) m2: vec4<f32>,
    @location(6) m3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(instance.m0, instance.m1, instance.m2, instance.m3);
    let world = model * vec4<f32>(vertex.position, 1.0);
    let n = (model * vec4<f32>(vertex.normal, 0.0)).xyz;

    var out: VertexOutput;
    out.clip = scene.view_proj * world;
    out.world = world.xyz;
    out.normal = n / max(length(n), 0.000001);
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(base_texture, base_sampler, in.uv);
    if (texel.a < material.params.x) {
        discard;
    }
    var color = texel.rgb * material.tint.rgb;
    if (material.emissive.a > 0.5) {
        color = color * lighting(in.world, in.normal);
    }
    color = color + material.emissive.rgb;
    return vec4<f32>(apply_fog(color, in.world), texel.a * material.tint.a);
}
"#;

/// Camera-facing additive sprites for sparkles and fireflies.
pub const POINT_BODY: &str = r#"
struct Sprite {
    // rgb tint, a = opacity
    color: vec4<f32>,
    // x = world size
    params: vec4<f32>,
};

@group(1) @binding(0) var<uniform> sprite: Sprite;
@group(1) @binding(1) var glow_texture: texture_2d<f32>;
@group(1) @binding(2) var glow_sampler: sampler;

struct PointInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct PointOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32, point: PointInput) -> PointOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, 0.5),
    );
    let corner = corners[vertex_index];
    let offset = scene.camera_right.xyz * corner.x + scene.camera_up.xyz * corner.y;
    let world = point.position + offset * sprite.params.x;

    var out: PointOutput;
    out.clip = scene.view_proj * vec4<f32>(world, 1.0);
    out.world = world;
    out.color = point.color * sprite.color.rgb;
    out.uv = corner + vec2<f32>(0.5, 0.5);
    return out;
}

@fragment
fn fs_main(in: PointOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(glow_texture, glow_sampler, in.uv);
    let color = apply_fog(in.color * texel.rgb, in.world);
    return vec4<f32>(color, texel.a * sprite.color.a);
}
"#;

/// Full source of the instanced mesh shader.
pub fn mesh_shader() -> String {
    format!("{SCENE_BLOCK}\n{MESH_BODY}")
}

/// Full source of the point sprite shader.
pub fn point_shader() -> String {
    format!("{SCENE_BLOCK}\n{POINT_BODY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates WGSL code using naga.
    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;
        Ok(())
    }

    #[test]
    fn test_mesh_shader_validates() {
        let code = mesh_shader();
        if let Err(e) = validate_wgsl(&code) {
            panic!("Mesh shader failed validation:\n{}", e);
        }
    }

    #[test]
    fn test_point_shader_validates() {
        let code = point_shader();
        if let Err(e) = validate_wgsl(&code) {
            panic!("Point shader failed validation:\n{}", e);
        }
    }

    #[test]
    fn test_entry_points_present() {
        for code in [mesh_shader(), point_shader()] {
            assert!(code.contains("fn vs_main"));
            assert!(code.contains("fn fs_main"));
            assert!(code.contains("fn apply_fog"));
        }
    }
}
