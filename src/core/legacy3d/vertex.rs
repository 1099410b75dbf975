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

//! Vertex buffer layout
//!
//! Every cached vertex carries the complete per-polygon material state so that
//! a whole model can be drawn with a single draw call. The layout is 25 floats:
//!
//! ```text
//!  0-2   position            13-14  texture UV (texels)
//!  3-5   normal              15-18  sub-texture X, Y, width, height
//!  6-8   material color      19     texture enable
//!  9     translucence        20     contour processing (>= 0 on)
//! 10     light enable        21-22  U/V mirrored repeat
//! 11     shininess (< 0 off) 23     texture format
//! 12     fog intensity       24     texture map number
//! ```

use bytemuck::{Pod, Zeroable};

use super::context::DecodeContext;
use super::polygon::{Polygon, Vertex};

/// One vertex as stored in the GPU vertex buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VboVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    /// 0.0 fully transparent, 1.0 opaque
    pub translucence: f32,
    /// 0.0 luminous, 1.0 lit
    pub light_enable: f32,
    /// Negative disables specular lighting
    pub shininess: f32,
    /// 0.0 no fog applied, 1.0 all fog applied
    pub fog_intensity: f32,
    pub uv: [f32; 2],
    /// Sub-texture X, Y, width and height in the host texture map
    pub sub_texture: [f32; 4],
    pub texture_enable: f32,
    /// >= 0 uses the texel alpha for contour discard, < 0 ignores it
    pub contour: f32,
    pub u_wrap: f32,
    pub v_wrap: f32,
    pub texture_format: f32,
    pub texture_map: f32,
}

impl VboVertex {
    /// Number of floats per vertex
    pub const FLOATS: usize = 25;

    /// Size of one vertex in bytes
    pub const SIZE: usize = Self::FLOATS * std::mem::size_of::<f32>();

    /// Build the buffer vertex for `vertex` of `polygon`
    ///
    /// `normal_flip` is 1.0 for the front side and -1.0 for the mirrored back
    /// side of double-sided polygons.
    pub fn from_polygon(
        polygon: &Polygon,
        vertex: &Vertex,
        normal_flip: f32,
        ctx: &DecodeContext<'_>,
    ) -> Self {
        let header = &polygon.header;
        let tex = header.texture_ref(ctx.tex_offset_xy);
        let sheet = ctx.sheet(tex.format);

        let translucence = if header.is_opaque() {
            1.0
        } else {
            header.translucency() as f32 * (1.0 / 31.0)
        };

        // Lit polygons always receive full fog
        let fog_intensity = if header.is_luminous() {
            header.fog_intensity() as f32 * (1.0 / 31.0)
        } else {
            1.0
        };

        Self {
            position: vertex.position,
            normal: [
                vertex.normal[0] * normal_flip,
                vertex.normal[1] * normal_flip,
                vertex.normal[2] * normal_flip,
            ],
            color: ctx.material_color(header),
            translucence,
            light_enable: if header.is_luminous() { 0.0 } else { 1.0 },
            shininess: header.shininess().map_or(-1.0, |s| s as f32),
            fog_intensity,
            uv: vertex.uv,
            sub_texture: [
                (sheet.x_offset + tex.x) as f32,
                (sheet.y_offset + tex.y) as f32,
                tex.width as f32,
                tex.height as f32,
            ],
            texture_enable: if header.texture_enabled() { 1.0 } else { 0.0 },
            contour: if header.contour_processing() { 1.0 } else { -1.0 },
            u_wrap: if header.u_mirror() { 1.0 } else { 0.0 },
            v_wrap: if header.v_mirror() { 1.0 } else { 0.0 },
            texture_format: header.texture_format() as f32,
            texture_map: sheet.map_num as f32,
        }
    }
}
