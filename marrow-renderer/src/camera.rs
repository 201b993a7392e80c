/// View/projection pair consumed read-only by the draw path.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub view: glam::Mat4,
    pub projection: glam::Mat4,
}

impl Camera {
    /// World-space eye position, recovered from the view matrix.
    pub fn position(&self) -> glam::Vec3 {
        self.view.inverse().w_axis.truncate()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: glam::Mat4::IDENTITY,
            projection: glam::Mat4::IDENTITY,
        }
    }
}
