// GLSL ES 3.00 sources. Every program receives `u_viewProjection` and
// `a_position` from the backend; the remaining uniforms belong to the layer.

pub const FIELD_VERTEX: &str = r#"#version 300 es
precision highp float;

in vec3 a_position;

uniform mat4 u_viewProjection;
uniform float uTime;
uniform vec2 uMouse;
uniform float uInteractionStrength;

out float vDistance;

void main() {
    vec3 pos = a_position;

    float wave = sin(uTime * 0.5 + pos.x * 0.2 + pos.y * 0.3) * 0.5;
    pos.z += wave;

    vec2 mousePos = uMouse * 50.0;
    float dist = distance(pos.xy, mousePos);
    float strength = 1.0 - clamp(dist / 10.0, 0.0, 1.0);
    pos.z += strength * uInteractionStrength * 5.0;

    vDistance = strength;

    gl_Position = u_viewProjection * vec4(pos, 1.0);
    gl_PointSize = mix(2.0, 4.0, strength);
}
"#;

pub const FIELD_FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform vec3 uColor;

in float vDistance;
out vec4 fragColor;

void main() {
    float alpha = 0.5 + vDistance * 0.5;
    vec2 center = gl_PointCoord - vec2(0.5);
    float circle = 1.0 - smoothstep(0.45, 0.5, length(center));
    fragColor = vec4(uColor, alpha * circle);
}
"#;

pub const TRAIL_VERTEX: &str = r#"#version 300 es
precision highp float;

in vec3 a_position;

uniform mat4 u_viewProjection;
uniform float uSize;
uniform float uCount;
uniform float uCameraDistance;

out float vOpacity;

void main() {
    vOpacity = 1.0 - float(gl_VertexID) / uCount;
    gl_Position = u_viewProjection * vec4(a_position, 1.0);
    gl_PointSize = uSize / uCameraDistance * vOpacity;
}
"#;

pub const TRAIL_FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform vec3 uColor;
uniform float uTime;

in float vOpacity;
out vec4 fragColor;

void main() {
    float strength = 1.0 - distance(gl_PointCoord, vec2(0.5));
    strength = pow(strength, 3.0);
    vec3 color = mix(uColor, vec3(1.0), 0.2);
    float flicker = 1.0 + sin(uTime * 2.0) * 0.2;
    fragColor = vec4(color, strength * vOpacity * 0.5 * flicker);
}
"#;

// The grid layer is a clip-space quad; `u_viewProjection` is ignored.
pub const GRID_VERTEX: &str = r#"#version 300 es
precision highp float;

in vec3 a_position;

uniform mat4 u_viewProjection;

void main() {
    gl_Position = vec4(a_position.xy, 0.0, 1.0);
}
"#;

pub const GRID_FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform float uTime;
uniform vec2 uMouse;
uniform float uMouseVelocity;
uniform vec2 uResolution;
uniform float uInteractionStrength;
uniform vec3 uColor;

out vec4 fragColor;

float random(vec2 st) {
    return fract(sin(dot(st.xy, vec2(12.9898, 78.233))) * 43758.5453123);
}

void main() {
    vec2 uv = gl_FragCoord.xy / uResolution.xy;
    vec2 mouse = uMouse * 0.5 + 0.5;

    float voidEffect = length(uv - mouse) + sin(uTime * 0.5) * 0.1;

    vec2 grid = fract(uv * (30.0 + uMouseVelocity * 10.0));
    float edge = 0.97 - uMouseVelocity * 0.1;
    float gridLine = step(edge, grid.x) + step(edge, grid.y);

    float glow = smoothstep(1.0, 0.0, voidEffect) * (0.15 + uInteractionStrength * 0.2);
    vec3 color = mix(uColor, vec3(1.0), uInteractionStrength) * glow;
    color += vec3(gridLine) * (0.03 + uInteractionStrength * 0.05);

    float noise = random(uv + uTime * (0.01 + uInteractionStrength * 0.05))
        * (0.02 + uInteractionStrength * 0.03);
    color += vec3(noise);

    float alpha = glow * (0.5 + uInteractionStrength * 0.3)
        + gridLine * (0.05 + uInteractionStrength * 0.1)
        + noise * 0.01;
    fragColor = vec4(color, alpha);
}
"#;
