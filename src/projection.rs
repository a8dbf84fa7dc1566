use crate::settings::{ProjectionMode, ProjectionSettings};
use nalgebra_glm as glm;

/// Size of the vertex-stage push constant block: one column-major mat4.
pub const PUSH_CONSTANT_WORDS: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Identity,
    Perspective {
        /// Vertical field of view, in degrees.
        field_of_view: f32,
        near_plane: f32,
        far_plane: f32,
        camera_distance: f32,
    },
}

impl Projection {
    pub fn from_settings(settings: &ProjectionSettings) -> Self {
        match settings.mode {
            ProjectionMode::Identity => Projection::Identity,
            ProjectionMode::Perspective => Projection::Perspective {
                field_of_view: settings.field_of_view,
                near_plane: settings.near_plane,
                far_plane: settings.far_plane,
                camera_distance: settings.camera_distance,
            },
        }
    }

    /// Clip-space transform for a viewport with the given width/height ratio.
    pub fn matrix(&self, aspect: f32) -> glm::Mat4 {
        // Vulkan clip space has +Y pointing down.
        let correction = glm::scaling(&glm::vec3(1.0, -1.0, 1.0));
        match *self {
            Projection::Identity => correction,
            Projection::Perspective {
                field_of_view,
                near_plane,
                far_plane,
                camera_distance,
            } => {
                let projection = glm::perspective_rh_zo(
                    aspect,
                    field_of_view.to_radians(),
                    near_plane,
                    far_plane,
                );
                let view = glm::translation(&glm::vec3(0.0, 0.0, -camera_distance));
                correction * projection * view
            }
        }
    }

    pub fn push_constants(&self, aspect: f32) -> [u32; PUSH_CONSTANT_WORDS] {
        let matrix = self.matrix(aspect);
        let mut words = [0u32; PUSH_CONSTANT_WORDS];
        for (word, value) in words.iter_mut().zip(matrix.as_slice()) {
            *word = value.to_bits();
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::tests::default_settings;

    fn perspective() -> Projection {
        let mut settings = default_settings().projection;
        settings.mode = ProjectionMode::Perspective;
        Projection::from_settings(&settings)
    }

    #[test]
    fn identity_only_flips_y() {
        let clip = Projection::Identity.matrix(16.0 / 9.0) * glm::vec4(0.0, 0.5, 0.0, 1.0);
        assert_eq!(clip, glm::vec4(0.0, -0.5, 0.0, 1.0));
    }

    #[test]
    fn default_settings_select_identity() {
        let settings = default_settings();
        assert_eq!(
            Projection::from_settings(&settings.projection),
            Projection::Identity
        );
    }

    #[test]
    fn perspective_keeps_the_triangle_in_front_of_the_camera() {
        let projection = perspective();
        for vertex in crate::renderer::vertex::POSITIONS.iter() {
            let clip = projection.matrix(16.0 / 9.0) * glm::vec4(vertex[0], vertex[1], 0.0, 1.0);
            assert!((clip.w - 1.5).abs() < 1e-5);
            let depth = clip.z / clip.w;
            assert!(depth > 0.0 && depth < 1.0, "depth {} outside clip volume", depth);
        }
    }

    #[test]
    fn perspective_top_vertex_is_above_center_on_screen() {
        let clip = perspective().matrix(1.0) * glm::vec4(0.0, 0.5, 0.0, 1.0);
        assert!(clip.y / clip.w < 0.0);
    }

    #[test]
    fn push_constants_are_column_major_bits() {
        let words = Projection::Identity.push_constants(1.0);
        assert_eq!(words[0], 1.0f32.to_bits());
        assert_eq!(words[5], (-1.0f32).to_bits());
        assert_eq!(words[10], 1.0f32.to_bits());
        assert_eq!(words[15], 1.0f32.to_bits());
        assert_eq!(words[1], 0.0f32.to_bits());
    }
}
