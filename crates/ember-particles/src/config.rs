//! Emitter configuration
//!
//! An explicit value passed into `emit` each call — particles snapshot the
//! config at spawn time, so edits apply to the next emit only and are never
//! retroactive.

use ember_core::Result;
use std::path::Path;

/// Shape drawn for each particle quad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleShape {
    Square,
    #[default]
    Circle,
    Triangle,
}

impl ParticleShape {
    pub fn label(&self) -> &'static str {
        match self {
            ParticleShape::Square => "square",
            ParticleShape::Circle => "circle",
            ParticleShape::Triangle => "triangle",
        }
    }
}

/// Spawn-time parameters for new particles
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    /// Simulation-clock seconds until a spawned particle expires
    pub lifetime: f32,
    /// Particles requested per emit call; non-positive means emit is a no-op
    pub spawn_count: i32,
    pub scale: f32,
    pub shape: ParticleShape,
    /// Fraction of the shape kept toward its outline, in (0, 1]
    pub shape_thickness: f32,
    pub initial_velocity: [f32; 3],
    pub acceleration: [f32; 3],
    /// Replace `initial_velocity` with per-component jitter at spawn
    pub random_velocity: bool,
    /// Replace `acceleration` with per-component jitter at spawn
    pub random_acceleration: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            start_color: [0.0, 0.5, 1.0, 1.0],
            end_color: [1.0, 0.0, 0.0, 1.0],
            lifetime: 5.0,
            spawn_count: 50,
            scale: 0.0025,
            shape: ParticleShape::Circle,
            shape_thickness: 0.8,
            initial_velocity: [0.0; 3],
            acceleration: [0.0; 3],
            random_velocity: true,
            random_acceleration: false,
        }
    }
}

impl EmitterConfig {
    /// Parse a config from a TOML table; unknown keys are ignored and
    /// missing keys keep their defaults.
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();

        if let Some(v) = table.get("start_color") {
            config.start_color = toml_vec4(v, config.start_color);
        }
        if let Some(v) = table.get("end_color") {
            config.end_color = toml_vec4(v, config.end_color);
        }
        if let Some(v) = table.get("lifetime") {
            config.lifetime = toml_f32(v, config.lifetime);
        }
        if let Some(v) = table.get("spawn_count") {
            config.spawn_count = v.as_integer().unwrap_or(config.spawn_count as i64) as i32;
        }
        if let Some(v) = table.get("scale") {
            config.scale = toml_f32(v, config.scale);
        }
        if let Some(v) = table.get("shape") {
            config.shape = match v.as_str().unwrap_or("circle") {
                "square" => ParticleShape::Square,
                "triangle" => ParticleShape::Triangle,
                _ => ParticleShape::Circle,
            };
        }
        if let Some(v) = table.get("shape_thickness") {
            config.shape_thickness = toml_f32(v, config.shape_thickness);
        }
        if let Some(v) = table.get("initial_velocity") {
            config.initial_velocity = toml_vec3(v, config.initial_velocity);
        }
        if let Some(v) = table.get("acceleration") {
            config.acceleration = toml_vec3(v, config.acceleration);
        }
        if let Some(v) = table.get("random_velocity") {
            config.random_velocity = v.as_bool().unwrap_or(config.random_velocity);
        }
        if let Some(v) = table.get("random_acceleration") {
            config.random_acceleration = v.as_bool().unwrap_or(config.random_acceleration);
        }

        config
    }

    /// Parse a config from TOML source text (viewer presets)
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::value::Table = toml::from_str(source)?;
        Ok(Self::from_toml(&table))
    }

    /// Load a config from a TOML preset file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

fn toml_vec3(v: &toml::Value, default: [f32; 3]) -> [f32; 3] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 3 {
            return [
                toml_f32(&arr[0], default[0]),
                toml_f32(&arr[1], default[1]),
                toml_f32(&arr[2], default[2]),
            ];
        }
    }
    default
}

fn toml_vec4(v: &toml::Value, default: [f32; 4]) -> [f32; 4] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 4 {
            return [
                toml_f32(&arr[0], default[0]),
                toml_f32(&arr[1], default[1]),
                toml_f32(&arr[2], default[2]),
                toml_f32(&arr[3], default[3]),
            ];
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = EmitterConfig::default();
        assert!(config.lifetime > 0.0);
        assert!(config.spawn_count > 0);
        assert!(config.scale > 0.0);
        assert_eq!(config.shape, ParticleShape::Circle);
    }

    #[test]
    fn parse_from_toml() {
        let source = r#"
start_color = [1.0, 0.5, 0.0, 1.0]
end_color = [1.0, 0.0, 0.0, 0.0]
lifetime = 2.5
spawn_count = 8
shape = "triangle"
shape_thickness = 0.4
random_velocity = false
initial_velocity = [0.001, 0.002, 0.0]
"#;
        let config = EmitterConfig::from_toml_str(source).unwrap();
        assert!((config.start_color[1] - 0.5).abs() < 0.01);
        assert!((config.lifetime - 2.5).abs() < 0.01);
        assert_eq!(config.spawn_count, 8);
        assert_eq!(config.shape, ParticleShape::Triangle);
        assert!(!config.random_velocity);
        assert!((config.initial_velocity[1] - 0.002).abs() < 1e-6);
    }

    #[test]
    fn toml_integer_float_coercion() {
        // TOML `acceleration = [0, -1, 0]` gives integers, not floats
        let config = EmitterConfig::from_toml_str("acceleration = [0, -1, 0]").unwrap();
        assert!((config.acceleration[0]).abs() < 1e-6);
        assert!((config.acceleration[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(EmitterConfig::from_toml_str("spawn_count = [").is_err());
    }

    #[test]
    fn unknown_shape_falls_back_to_circle() {
        let config = EmitterConfig::from_toml_str(r#"shape = "hexagon""#).unwrap();
        assert_eq!(config.shape, ParticleShape::Circle);
    }

    #[test]
    fn loads_preset_from_file() {
        let path = std::env::temp_dir().join("ember_preset_roundtrip.toml");
        std::fs::write(&path, "lifetime = 1.5\nshape = \"square\"").unwrap();
        let config = EmitterConfig::from_toml_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.shape, ParticleShape::Square);
        assert!((config.lifetime - 1.5).abs() < 1e-6);
    }

    #[test]
    fn missing_preset_file_is_an_io_error() {
        let err = EmitterConfig::from_toml_file(Path::new("/nonexistent/preset.toml"))
            .unwrap_err();
        assert!(matches!(err, ember_core::EmberError::IoError(_)));
    }
}
