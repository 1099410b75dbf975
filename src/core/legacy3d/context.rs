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

//! Per-model and per-instance rendering state
//!
//! The scene graph walker accumulates transforms, texture offsets, lighting
//! and fog while it descends. These snapshots are handed to the cache and the
//! display list compiler explicitly instead of being read from shared state.

use serde::{Deserialize, Serialize};

use super::geometry::{Mat4, IDENTITY};
use super::polygon::PolygonHeader;
use super::texture::{TexSheet, TextureManager};

/// Word offset of the color table in polygon RAM
pub const COLOR_TABLE_BASE: usize = 0x400;

/// Which header bit controls texel color modulation
///
/// The hardware meaning of these bits is not settled. Word 4 bit 7 clear
/// enables modulation and makes the Daytona 2 traffic lights blink and Sega
/// Rally 2 look right; word 3 bit 7 set enabling modulation suits other titles
/// (Scud Race waterfalls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationSource {
    /// Modulate unless word 4 bit 7 is set
    #[default]
    Word4Bit7,
    /// Modulate when word 3 bit 7 is set
    Word3Bit7,
}

impl ModulationSource {
    /// True if texels should be multiplied by the polygon color
    pub fn modulate(self, header: &PolygonHeader) -> bool {
        match self {
            ModulationSource::Word4Bit7 => !header.modulate_disable_bit(),
            ModulationSource::Word3Bit7 => header.alternate_modulate_bit(),
        }
    }
}

/// State needed to decode one model
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Scale from fixed-point vertex positions to model units
    pub vertex_factor: f32,
    /// Z component of the coordinate system matrix (-1 for into-the-screen)
    pub z_sign: f32,
    /// Texture offset applied to every polygon's texture base, in texels
    pub tex_offset_xy: [i32; 2],
    /// Polygon RAM, for color-index lookups
    pub polygon_ram: &'a [u32],
    /// Color modulation heuristic
    pub modulation: ModulationSource,
    /// Host texture sheet for each texture format
    pub tex_sheets: [TexSheet; 8],
}

impl Default for DecodeContext<'_> {
    fn default() -> Self {
        Self {
            vertex_factor: 1.0 / 128.0,
            z_sign: -1.0,
            tex_offset_xy: [0, 0],
            polygon_ram: &[],
            modulation: ModulationSource::default(),
            tex_sheets: [TexSheet::default(); 8],
        }
    }
}

impl DecodeContext<'_> {
    /// Fill `tex_sheets` from the texture manager's layout
    pub fn with_sheets_from(mut self, textures: &dyn TextureManager) -> Self {
        for (format, sheet) in self.tex_sheets.iter_mut().enumerate() {
            *sheet = textures.sheet(format as u8);
        }
        self
    }

    /// Texture sheet for `format`
    pub fn sheet(&self, format: u8) -> &TexSheet {
        &self.tex_sheets[(format & 7) as usize]
    }

    /// Polygon material color as normalized RGB
    ///
    /// Indexed colors come from the color table in polygon RAM, stored as
    /// `0x00RRGGBB`; indices past the end of RAM read as white. Textured
    /// polygons without modulation are always white so texels pass through.
    pub fn material_color(&self, header: &PolygonHeader) -> [f32; 3] {
        let [r, g, b] = if header.has_rgb_color() {
            header.rgb()
        } else {
            match self.polygon_ram.get(COLOR_TABLE_BASE + header.color_index()) {
                Some(&color) => [(color >> 16) as u8, (color >> 8) as u8, color as u8],
                None => [0xFF, 0xFF, 0xFF],
            }
        };

        if header.texture_enabled() && !self.modulation.modulate(header) {
            return [1.0, 1.0, 1.0];
        }

        [
            r as f32 * (1.0 / 255.0),
            g as f32 * (1.0 / 255.0),
            b as f32 * (1.0 / 255.0),
        ]
    }
}

/// Transform snapshot for one model instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Model-view matrix (column-major)
    pub model_view: Mat4,
    /// Z component of the coordinate system matrix
    pub z_sign: f32,
}

impl Transform {
    pub fn new(model_view: Mat4, z_sign: f32) -> Self {
        Self { model_view, z_sign }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            model_view: IDENTITY,
            z_sign: -1.0,
        }
    }
}

/// Viewport, lighting and fog snapshot
///
/// Applies to every model that follows it in a display list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Viewport rectangle in window pixels
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Sun direction (xyz) followed by sun intensity, ambient intensity and unused
    pub lighting: [f32; 6],
    /// Fog color (rgb), density and start
    pub fog: [f32; 5],
    /// Spotlight ellipse center (x, y) and inverse half-extents
    pub spot_ellipse: [f32; 4],
    /// Spotlight near and far range
    pub spot_range: [f32; 2],
    /// Spotlight color
    pub spot_color: [f32; 3],
    /// Projection matrix (column-major)
    pub projection: Mat4,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 496,
            height: 384,
            lighting: [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            fog: [0.0; 5],
            spot_ellipse: [0.0; 4],
            spot_range: [0.0; 2],
            spot_color: [0.0; 3],
            projection: IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::legacy3d::polygon::{MaterialFlags, ShapeFlags};

    fn header(word3: u32, word4: u32, shape: ShapeFlags, material: MaterialFlags) -> PolygonHeader {
        PolygonHeader([0, shape.bits(), 0, word3, word4, 0, material.bits()])
    }

    #[test]
    fn test_rgb_color() {
        let ctx = DecodeContext::default();
        let h = header(
            0,
            0xFF_80_00_00,
            ShapeFlags::RGB_COLOR,
            MaterialFlags::OPAQUE,
        );
        let [r, g, b] = ctx.material_color(&h);
        assert_eq!(r, 1.0);
        assert_eq!(g, 128.0 * (1.0 / 255.0));
        assert_eq!(b, 0.0);
    }

    #[test]
    fn test_indexed_color_reads_color_table() {
        let mut ram = vec![0u32; COLOR_TABLE_BASE + 0x10];
        ram[COLOR_TABLE_BASE + 5] = 0x00_00_FF_00;
        let ctx = DecodeContext {
            polygon_ram: &ram,
            ..DecodeContext::default()
        };
        let h = header(0, 5 << 8, ShapeFlags::empty(), MaterialFlags::OPAQUE);
        assert_eq!(ctx.material_color(&h), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_indexed_color_out_of_range_is_white() {
        let ctx = DecodeContext::default();
        let h = header(0, 5 << 8, ShapeFlags::empty(), MaterialFlags::OPAQUE);
        assert_eq!(ctx.material_color(&h), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_unmodulated_texture_is_white() {
        let ctx = DecodeContext::default();
        let h = header(
            0,
            0x00_00_00_80,
            ShapeFlags::RGB_COLOR,
            MaterialFlags::TEXTURE | MaterialFlags::OPAQUE,
        );
        assert_eq!(ctx.material_color(&h), [1.0, 1.0, 1.0]);

        // Same polygon with modulation enabled keeps its (black) color
        let h = header(
            0,
            0,
            ShapeFlags::RGB_COLOR,
            MaterialFlags::TEXTURE | MaterialFlags::OPAQUE,
        );
        assert_eq!(ctx.material_color(&h), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_alternate_modulation_source() {
        let ctx = DecodeContext {
            modulation: ModulationSource::Word3Bit7,
            ..DecodeContext::default()
        };
        let textured = ShapeFlags::RGB_COLOR;
        let material = MaterialFlags::TEXTURE | MaterialFlags::OPAQUE;

        assert_eq!(
            ctx.material_color(&header(0, 0, textured, material)),
            [1.0, 1.0, 1.0]
        );
        assert_eq!(
            ctx.material_color(&header(0x80, 0, textured, material)),
            [0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_sheets_from_texture_manager() {
        struct Sheets;
        impl TextureManager for Sheets {
            fn add_ref(&mut self, _tex: &crate::core::legacy3d::TextureRef) -> bool {
                true
            }
            fn decode_texture(&mut self, _tex: &crate::core::legacy3d::TextureRef) {}
            fn sheet(&self, format: u8) -> TexSheet {
                TexSheet {
                    map_num: format as u32,
                    x_offset: 0,
                    y_offset: 2048 * format as u32,
                }
            }
        }

        let ctx = DecodeContext::default().with_sheets_from(&Sheets);
        assert_eq!(ctx.sheet(3).map_num, 3);
        assert_eq!(ctx.sheet(7).y_offset, 2048 * 7);
    }

    #[test]
    fn test_modulation_source_serde_names() {
        let json = serde_json::to_string(&ModulationSource::Word3Bit7).unwrap();
        assert_eq!(json, "\"word3_bit7\"");
    }
}
