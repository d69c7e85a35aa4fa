//! Ember Render - wgpu-based renderer for particle effects
//!
//! Draws packed particle instances as GPU-instanced quads into an HDR
//! offscreen target, then applies a separable Gaussian blur and additive
//! bloom composite onto the window surface.

mod camera;
mod context;
pub mod particle_pipeline;
pub mod postprocess;

pub use camera::Camera;
pub use context::{RenderContext, RenderError};
pub use particle_pipeline::{ParticleRenderer, ParticleSurface, ParticleUniforms};
pub use postprocess::{
    BlurUniforms, PostProcessConfig, PostProcessPipeline, PostProcessResources, HDR_FORMAT,
};

#[cfg(test)]
mod tests {
    #[test]
    fn particle_shader_wgsl_parses() {
        let source = include_str!("particle_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("particle_shader.wgsl failed to parse");
    }

    #[test]
    fn blur_shader_wgsl_parses() {
        let source = include_str!("blur_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("blur_shader.wgsl failed to parse");
    }

    #[test]
    fn composite_shader_wgsl_parses() {
        let source = include_str!("composite_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("composite_shader.wgsl failed to parse");
    }
}
