//! Translation / rotation / scale transforms.
//!
//! [`Instance`] is the decomposed form of a node or placement transform. The
//! flattening pipeline works on matrices; instances exist for readable
//! configuration and for inspecting baked matrices.

use cgmath::{InnerSpace, One};

/// A transform stored as position, rotation (as quaternion) and scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Decompose an affine matrix without shear.
    ///
    /// Scale is taken from the basis vector lengths; a negative determinant is
    /// folded into the x scale.
    pub fn from_matrix(matrix: &cgmath::Matrix4<f32>) -> Self {
        let position = matrix.w.truncate();
        let mut scale = cgmath::Vector3::new(
            matrix.x.truncate().magnitude(),
            matrix.y.truncate().magnitude(),
            matrix.z.truncate().magnitude(),
        );
        let upper = cgmath::Matrix3::from_cols(
            matrix.x.truncate(),
            matrix.y.truncate(),
            matrix.z.truncate(),
        );
        if cgmath::SquareMatrix::determinant(&upper) < 0.0 {
            scale.x = -scale.x;
        }
        let rotation = if scale.x == 0.0 || scale.y == 0.0 || scale.z == 0.0 {
            cgmath::Quaternion::one()
        } else {
            let rot = cgmath::Matrix3::from_cols(
                upper.x / scale.x,
                upper.y / scale.y,
                upper.z / scale.z,
            );
            cgmath::Quaternion::from(rot).normalize()
        };
        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
