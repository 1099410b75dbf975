// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Geometry helpers for winding reconciliation
//!
//! Small fixed-size vector and matrix routines. Matrices captured from the
//! scene graph are 4×4, column-major (OpenGL layout); only their upper-left
//! 3×3 rotation/scale part matters here.
//!
//! # Winding reconciliation
//!
//! Real3D culls backfaces in view space using the polygon normal, whereas the
//! host backend culls by the winding of the projected vertices. A matrix that
//! mirrors a single axis flips the winding without flipping the normal, so the
//! backend would discard polygons the hardware keeps. [`resolve_winding`]
//! detects this per model instance and picks the front face to use.

/// Three-component vector
pub type Vec3 = [f32; 3];

/// 3×3 matrix, indexed `[row][column]`
pub type Mat3 = [[f32; 3]; 3];

/// 4×4 column-major matrix
pub type Mat4 = [f32; 16];

/// 4×4 identity matrix
pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Front-face convention for one drawn model instance
///
/// `NoCull` is used when the transform collapses the polygon plane so that no
/// winding can be trusted; the renderer disables culling for the draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Clockwise triangles face the viewer (the order vertices are cached in)
    Clockwise,
    /// Counter-clockwise triangles face the viewer
    CounterClockwise,
    /// Culling must be disabled
    NoCull,
}

/// Build a column-major scale matrix
pub fn scale_matrix(x: f32, y: f32, z: f32) -> Mat4 {
    let mut m = IDENTITY;
    m[0] = x;
    m[5] = y;
    m[10] = z;
    m
}

/// Extract the upper-left 3×3 part of a column-major 4×4 matrix
pub fn upper_mat3(m: &Mat4) -> Mat3 {
    [
        [m[0], m[4], m[8]],
        [m[1], m[5], m[9]],
        [m[2], m[6], m[10]],
    ]
}

/// Cross product `a × b`
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Dot product `a · b`
pub fn dot(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Multiply a 3×3 matrix by a column vector
pub fn mul_mat3_vec3(m: &Mat3, v: &Vec3) -> Vec3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Compute `transpose(inverse(m))`, the matrix that transforms normals
///
/// Returns `None` when `m` is singular.
pub fn invert_transpose_mat3(m: &Mat3) -> Option<Mat3> {
    let [[a00, a01, a02], [a10, a11, a12], [a20, a21, a22]] = *m;

    let det = a00 * (a22 * a11 - a21 * a12) - a10 * (a22 * a01 - a21 * a02)
        + a20 * (a12 * a01 - a11 * a02);
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;

    // Cofactor matrix divided by the determinant; the inverse is its transpose,
    // so storing the cofactors directly yields inverse-transpose.
    Some([
        [
            inv_det * (a22 * a11 - a21 * a12),
            -inv_det * (a22 * a10 - a20 * a12),
            inv_det * (a21 * a10 - a20 * a11),
        ],
        [
            -inv_det * (a22 * a01 - a21 * a02),
            inv_det * (a22 * a00 - a20 * a02),
            -inv_det * (a21 * a00 - a20 * a01),
        ],
        [
            inv_det * (a12 * a01 - a11 * a02),
            -inv_det * (a12 * a00 - a10 * a02),
            inv_det * (a11 * a00 - a10 * a01),
        ],
    ])
}

/// Sign of `x` as -1, 0 or 1 (NaN maps to 0)
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Scale `v` to unit length
///
/// Zero-length vectors are returned unchanged.
pub fn normalize(v: &Vec3) -> Vec3 {
    let mag = dot(v, v).sqrt();
    if mag == 0.0 || !mag.is_finite() {
        return *v;
    }
    [v[0] / mag, v[1] / mag, v[2] / mag]
}

/// Decide the front face for a model instance drawn with `model_view`
///
/// A fictitious polygon with edges X = (1, 0, 0) and Y = (0, 1, 0) and normal
/// Z = (0, 0, -`z_sign`) is transformed: the edges by the model-view matrix,
/// the normal by its inverse-transpose. The cross product of the transformed
/// edges is the normal the backend culls with. If its Z component agrees in
/// sign with the transformed hardware normal, clockwise winding is kept;
/// otherwise it is reversed. A zero product means culling must be disabled.
///
/// `z_sign` is the Z component of the coordinate system matrix (element 5 of
/// the matrix table), -1 for the usual into-the-screen convention.
///
/// # Examples
///
/// ```
/// use real3d::core::legacy3d::geometry::{resolve_winding, scale_matrix, Winding, IDENTITY};
///
/// assert_eq!(resolve_winding(&IDENTITY, -1.0), Winding::Clockwise);
/// assert_eq!(
///     resolve_winding(&scale_matrix(-1.0, 1.0, 1.0), -1.0),
///     Winding::CounterClockwise
/// );
/// ```
pub fn resolve_winding(model_view: &Mat4, z_sign: f32) -> Winding {
    const X: Vec3 = [1.0, 0.0, 0.0];
    const Y: Vec3 = [0.0, 1.0, 0.0];
    let z: Vec3 = [0.0, 0.0, -z_sign];

    let m = upper_mat3(model_view);
    let Some(normal_matrix) = invert_transpose_mat3(&m) else {
        return Winding::NoCull;
    };

    let x_t = mul_mat3_vec3(&m, &X);
    let y_t = mul_mat3_vec3(&m, &Y);
    let z_t = mul_mat3_vec3(&normal_matrix, &z);
    let p_t = cross(&x_t, &y_t);

    let s = sign(z_t[2] * p_t[2]);
    if s < 0.0 {
        Winding::CounterClockwise
    } else if s > 0.0 {
        Winding::Clockwise
    } else {
        Winding::NoCull
    }
}

/// Check whether a polygon's vertices already run clockwise
///
/// The edges `v0 - v1` and `v2 - v1` are crossed and compared against the
/// polygon normal. The product is scaled by `-z_sign` because some games use a
/// coordinate system whose Z axis points out of the screen.
pub fn polygon_is_clockwise(v0: &Vec3, v1: &Vec3, v2: &Vec3, normal: &Vec3, z_sign: f32) -> bool {
    let e1 = [v0[0] - v1[0], v0[1] - v1[1], v0[2] - v1[2]];
    let e2 = [v2[0] - v1[0], v2[1] - v1[1], v2[2] - v1[2]];
    let n = cross(&e1, &e2);
    -z_sign * dot(&n, normal) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_x_90() -> Mat4 {
        // Columns: X stays, Y -> Z, Z -> -Y
        [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    #[test]
    fn test_cross_product_basis() {
        assert_eq!(cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(cross(&[0.0, 1.0, 0.0], &[1.0, 0.0, 0.0]), [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_upper_mat3_column_major() {
        let mut m = IDENTITY;
        m[4] = 2.0; // column 1, row 0
        m[2] = 3.0; // column 0, row 2
        let m3 = upper_mat3(&m);
        assert_eq!(m3[0][1], 2.0);
        assert_eq!(m3[2][0], 3.0);
    }

    #[test]
    fn test_invert_transpose_identity() {
        let m = upper_mat3(&IDENTITY);
        assert_eq!(invert_transpose_mat3(&m), Some(m));
    }

    #[test]
    fn test_invert_transpose_scale() {
        let m = upper_mat3(&scale_matrix(2.0, 4.0, -1.0));
        let it = invert_transpose_mat3(&m).unwrap();
        assert_eq!(it[0][0], 0.5);
        assert_eq!(it[1][1], 0.25);
        assert_eq!(it[2][2], -1.0);
    }

    #[test]
    fn test_invert_transpose_shear_is_transposed() {
        // Shear: x' = x + y. Inverse: x = x' - y'. Transposed puts -1 at [1][0].
        let m: Mat3 = [[1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let it = invert_transpose_mat3(&m).unwrap();
        assert_eq!(it[1][0], -1.0);
        assert_eq!(it[0][1], 0.0);
    }

    #[test]
    fn test_invert_transpose_singular() {
        let m = upper_mat3(&scale_matrix(0.0, 1.0, 1.0));
        assert_eq!(invert_transpose_mat3(&m), None);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.5), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(f32::NAN), 0.0);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[3.0, 0.0, 4.0]), [0.6, 0.0, 0.8]);
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resolve_winding_identity_is_clockwise() {
        assert_eq!(resolve_winding(&IDENTITY, -1.0), Winding::Clockwise);
    }

    #[test]
    fn test_resolve_winding_single_mirror_reverses() {
        for m in [
            scale_matrix(-1.0, 1.0, 1.0),
            scale_matrix(1.0, -1.0, 1.0),
            scale_matrix(1.0, 1.0, -1.0),
        ] {
            assert_eq!(resolve_winding(&m, -1.0), Winding::CounterClockwise);
        }
    }

    #[test]
    fn test_resolve_winding_double_mirror_keeps_clockwise() {
        let m = scale_matrix(-1.0, -1.0, 1.0);
        assert_eq!(resolve_winding(&m, -1.0), Winding::Clockwise);
    }

    #[test]
    fn test_resolve_winding_positive_z_coordinate_system() {
        assert_eq!(resolve_winding(&IDENTITY, 1.0), Winding::CounterClockwise);
    }

    #[test]
    fn test_resolve_winding_edge_on_disables_culling() {
        assert_eq!(resolve_winding(&rotation_x_90(), -1.0), Winding::NoCull);
    }

    #[test]
    fn test_resolve_winding_singular_disables_culling() {
        let m = scale_matrix(0.0, 1.0, 1.0);
        assert_eq!(resolve_winding(&m, -1.0), Winding::NoCull);
    }

    #[test]
    fn test_resolve_winding_translation_ignored() {
        let mut m = scale_matrix(-1.0, 1.0, 1.0);
        m[12] = 100.0;
        m[13] = -50.0;
        m[14] = -300.0;
        assert_eq!(resolve_winding(&m, -1.0), Winding::CounterClockwise);
    }

    #[test]
    fn test_polygon_is_clockwise() {
        // Normal toward +Z (toward viewer with Z axis = -1)
        let normal = [0.0, 0.0, 1.0];
        let v0 = [0.0, 1.0, 0.0];
        let v1 = [0.0, 0.0, 0.0];
        let v2 = [1.0, 0.0, 0.0];
        // (v0-v1) x (v2-v1) = (0,1,0) x (1,0,0) = (0,0,-1)
        assert!(!polygon_is_clockwise(&v0, &v1, &v2, &normal, -1.0));
        assert!(polygon_is_clockwise(&v2, &v1, &v0, &normal, -1.0));
        assert!(polygon_is_clockwise(&v0, &v1, &v2, &normal, 1.0));
    }

    #[test]
    fn test_polygon_is_clockwise_degenerate_keeps_order() {
        let p = [1.0, 1.0, 1.0];
        assert!(polygon_is_clockwise(&p, &p, &p, &[0.0, 0.0, 1.0], -1.0));
    }
}
