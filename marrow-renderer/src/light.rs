/// Light slots handed to the material stage every frame.
pub const MAX_LIGHTS: usize = 5;

/// GPU-layout light descriptor. Padding keeps the fields on the 16-byte
/// boundaries the shader-side struct expects.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light {
    pub kind: u32,
    _pad0: [f32; 3],
    pub direction: [f32; 3],
    pub range: f32,
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub spot_inner_angle: f32,
    pub spot_outer_angle: f32,
    _pad1: [f32; 3],
}

impl Light {
    pub const NONE: u32 = 0;
    pub const DIRECTIONAL: u32 = 1;
    pub const POINT: u32 = 2;
    pub const SPOT: u32 = 3;

    pub fn directional(direction: glam::Vec3, color: glam::Vec3, intensity: f32) -> Self {
        Self {
            kind: Self::DIRECTIONAL,
            direction: direction.to_array(),
            color: color.to_array(),
            intensity,
            ..Default::default()
        }
    }

    pub fn point(position: glam::Vec3, color: glam::Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: Self::POINT,
            position: position.to_array(),
            color: color.to_array(),
            intensity,
            range,
            ..Default::default()
        }
    }

    pub fn spot(
        position: glam::Vec3,
        direction: glam::Vec3,
        color: glam::Vec3,
        intensity: f32,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    ) -> Self {
        Self {
            kind: Self::SPOT,
            position: position.to_array(),
            direction: direction.to_array(),
            color: color.to_array(),
            intensity,
            range,
            spot_inner_angle: inner_angle,
            spot_outer_angle: outer_angle,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_matches_its_shader_layout() {
        assert_eq!(std::mem::size_of::<Light>(), 80);
    }
}
