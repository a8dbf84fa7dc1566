pub const VERTEX_COUNT: usize = 3;
pub const POSITION_SIZE: usize = 2;
pub const COLOR_SIZE: usize = 3;

const R: [f32; COLOR_SIZE] = [1.0, 0.0, 0.0];
const G: [f32; COLOR_SIZE] = [0.0, 1.0, 0.0];
const B: [f32; COLOR_SIZE] = [0.0, 0.0, 1.0];

pub type Position = [f32; POSITION_SIZE];
pub type Color = [f32; COLOR_SIZE];

/// Bound at vertex binding 0, shader location 0.
pub const POSITIONS: [Position; VERTEX_COUNT] = [[-0.5, -0.5], [0.5, -0.5], [0.0, 0.5]];

/// Bound at vertex binding 1, shader location 1.
pub const COLORS: [Color; VERTEX_COUNT] = [R, G, B];

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn attribute_strides_match_declared_sizes() {
        assert_eq!(mem::size_of::<Position>(), POSITION_SIZE * 4);
        assert_eq!(mem::size_of::<Color>(), COLOR_SIZE * 4);
        assert_eq!(mem::size_of_val(&POSITIONS), VERTEX_COUNT * POSITION_SIZE * 4);
        assert_eq!(mem::size_of_val(&COLORS), VERTEX_COUNT * COLOR_SIZE * 4);
    }

    #[test]
    fn triangle_has_positive_area() {
        let [a, b, c] = POSITIONS;
        let area = (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]);
        assert!(area > 0.0);
    }

    #[test]
    fn each_vertex_gets_one_primary_color() {
        for color in COLORS.iter() {
            assert_eq!(color.iter().sum::<f32>(), 1.0);
        }
    }
}
