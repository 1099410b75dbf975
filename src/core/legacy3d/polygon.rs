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

//! Real3D polygon stream decoding
//!
//! Models are stored as a sequence of polygons. Each polygon starts with a
//! 7-word header followed by the vertices it does not share with the previous
//! polygon, 4 words per vertex.
//!
//! # Header Layout
//!
//! ```text
//! Word 0: SSSSSS.. ........ ......II E.Q.RRRR
//!         S = specular shininess, I = invalid marker (both set), E = specular enable,
//!         Q = quad, R = vertex reuse mask
//! Word 1: NNNNNNNN NNNNNNNN NNNNNNNN .U.D.LC.   N = normal X (1.22), U = full UV scale,
//!                                               D = double sided, L = last polygon, C = RGB color
//! Word 2: NNNNNNNN NNNNNNNN NNNNNNNN ......UV   N = normal Y, U/V = mirrored repeat
//! Word 3: NNNNNNNN NNNNNNNN NNNNNNNN M.WWWHHH   N = normal Z, M = alternate modulate bit,
//!                                               W/H = texture width/height (32 << n)
//! Word 4: RRRRRRRR GGGGGGGG BBBBBBBB MP.XXXXX   RGB color (bits 18-8 double as color index),
//!                                               M = modulate disable, P = texture page, X = tex X hi
//! Word 5: ........ ........ ........ X..YYYYY   X = tex X low bit, Y = tex Y base
//! Word 6: C....T.. OTTTTTLF FFFF..FF F....BA.   C = contour, T(26) = texture enable, O = opaque,
//!                                               T = translucency, L = luminous, F = fog intensity,
//!                                               F(9-7) = texture format, B/A = interleave select
//! ```
//!
//! A header whose word 6 is zero terminates the model.
//!
//! # Vertex Layout
//!
//! ```text
//! Word 0: XXXXXXXX XXXXXXXX XXXXXXXX nnnnnnnn   X = position (signed 24-bit), n = normal X offset
//! Word 1: YYYYYYYY YYYYYYYY YYYYYYYY nnnnnnnn
//! Word 2: ZZZZZZZZ ZZZZZZZZ ZZZZZZZZ nnnnnnnn
//! Word 3: UUUUUUUU UUUUUUUU VVVVVVVV VVVVVVVV
//! ```

use std::fmt;

use bitflags::bitflags;

use super::geometry::{normalize, Vec3};
use super::texture::TextureRef;
use crate::core::error::{EmulatorError, Result};

/// Number of words in a polygon header
pub const HEADER_WORDS: usize = 7;

/// Number of words per explicitly stored vertex
pub const VERTEX_WORDS: usize = 4;

/// Scale of the 1.22 fixed-point polygon normal
const NORMAL_SCALE: f32 = 1.0 / 4_194_304.0;

/// Texture format codes (word 6, bits 9-7)
pub mod tex_format {
    /// T1RGB5, the only true contour texture format
    pub const T1RGB5: u8 = 0;
    /// A4L4, interleaved, selected by word 6 bit 1
    pub const A4L4_INTERLEAVED_LOW: u8 = 1;
    /// A4L4, interleaved, selected by word 6 bit 2
    pub const A4L4_INTERLEAVED_HIGH: u8 = 3;
    /// A4L4
    pub const A4L4: u8 = 4;
    /// RGBA4
    pub const RGBA4: u8 = 7;
}

bitflags! {
    /// Flag bits of header word 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShapeFlags: u32 {
        /// Color comes from the RGB field rather than the color table
        const RGB_COLOR = 0x02;
        /// Last polygon in the model
        const LAST = 0x04;
        /// Polygon is visible from both sides
        const DOUBLE_SIDED = 0x10;
        /// UV coordinates are whole texels (otherwise 13.3 fixed point)
        const FULL_UV_SCALE = 0x40;
    }
}

bitflags! {
    /// Flag bits of header word 6
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaterialFlags: u32 {
        /// Selects the alpha channel for interleaved A4L4 format 1
        const INTERLEAVE_LOW = 0x0000_0002;
        /// Selects the alpha channel for interleaved A4L4 format 3
        const INTERLEAVE_HIGH = 0x0000_0004;
        /// Polygon is luminous (lighting disabled)
        const LUMINOUS = 0x0001_0000;
        /// Polygon is opaque regardless of the translucency level
        const OPAQUE = 0x0080_0000;
        /// Texturing enabled
        const TEXTURE = 0x0400_0000;
        /// Contour (alpha test) processing enabled
        const CONTOUR = 0x8000_0000;
    }
}

/// Rendering pass a polygon belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolyState {
    /// Drawn first, blending disabled
    Opaque = 0,
    /// Drawn after all opaque geometry, blending enabled, order-sensitive
    Alpha = 1,
}

impl PolyState {
    /// Both states in drawing order
    pub const ALL: [PolyState; 2] = [PolyState::Opaque, PolyState::Alpha];

    /// Index into per-state arrays
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PolyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolyState::Opaque => write!(f, "opaque"),
            PolyState::Alpha => write!(f, "alpha"),
        }
    }
}

/// The 7-word polygon header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolygonHeader(pub [u32; HEADER_WORDS]);

impl PolygonHeader {
    /// Raw header word
    pub fn word(&self, index: usize) -> u32 {
        self.0[index]
    }

    /// Header word 1 flags
    pub fn shape(&self) -> ShapeFlags {
        ShapeFlags::from_bits_truncate(self.0[1])
    }

    /// Header word 6 flags
    pub fn material(&self) -> MaterialFlags {
        MaterialFlags::from_bits_truncate(self.0[6])
    }

    /// True if this header ends the polygon stream without describing a polygon
    pub fn is_terminator(&self) -> bool {
        self.0[6] == 0
    }

    /// Bitmask of previous-polygon vertices reused by this polygon
    pub fn reuse_mask(&self) -> u32 {
        self.0[0] & 0xF
    }

    /// Quad (4 vertices) rather than triangle
    pub fn is_quad(&self) -> bool {
        self.0[0] & 0x40 != 0
    }

    /// Number of vertices (3 or 4)
    pub fn num_verts(&self) -> usize {
        if self.is_quad() {
            4
        } else {
            3
        }
    }

    /// False when both invalid-marker bits (word 0, bits 8-9) are set
    ///
    /// Some streams (Sega Rally 2 dust trails) contain polygons with garbage
    /// vertices carrying this marker. They must be decoded past but not drawn.
    pub fn is_valid(&self) -> bool {
        self.0[0] & 0x300 != 0x300
    }

    /// Last polygon in the model
    pub fn is_last(&self) -> bool {
        self.shape().contains(ShapeFlags::LAST)
    }

    pub fn is_double_sided(&self) -> bool {
        self.shape().contains(ShapeFlags::DOUBLE_SIDED)
    }

    /// Polygon normal, decoded from the sign + 1.22 fixed-point upper 24 bits of words 1-3
    pub fn normal(&self) -> Vec3 {
        [
            ((self.0[1] as i32) >> 8) as f32 * NORMAL_SCALE,
            ((self.0[2] as i32) >> 8) as f32 * NORMAL_SCALE,
            ((self.0[3] as i32) >> 8) as f32 * NORMAL_SCALE,
        ]
    }

    /// Scale applied to raw UV coordinates
    pub fn uv_scale(&self) -> f32 {
        if self.shape().contains(ShapeFlags::FULL_UV_SCALE) {
            1.0
        } else {
            1.0 / 8.0
        }
    }

    pub fn texture_enabled(&self) -> bool {
        self.material().contains(MaterialFlags::TEXTURE)
    }

    /// Texture format code (0-7)
    pub fn texture_format(&self) -> u8 {
        ((self.0[6] >> 7) & 7) as u8
    }

    /// Texture width in texels
    pub fn texture_width(&self) -> u32 {
        32 << ((self.0[3] >> 3) & 7)
    }

    /// Texture height in texels
    pub fn texture_height(&self) -> u32 {
        32 << (self.0[3] & 7)
    }

    /// Texture page, expressed as a Y offset into the texture map
    pub fn texture_page(&self) -> u32 {
        if self.0[4] & 0x40 != 0 {
            1024
        } else {
            0
        }
    }

    /// Texture base X before the texture offset is applied
    pub fn texture_base_x(&self) -> u32 {
        32 * (((self.0[4] & 0x1F) << 1) | ((self.0[5] >> 7) & 1))
    }

    /// Texture base Y before the texture offset is applied (includes the page)
    pub fn texture_base_y(&self) -> u32 {
        32 * (self.0[5] & 0x1F) + self.texture_page()
    }

    /// Texture referenced by this polygon, displaced by `offset` and wrapped to the 2048×2048 map
    pub fn texture_ref(&self, offset: [i32; 2]) -> TextureRef {
        TextureRef {
            format: self.texture_format(),
            x: (self.texture_base_x() as i32).wrapping_add(offset[0]) as u32 & 2047,
            y: (self.texture_base_y() as i32).wrapping_add(offset[1]) as u32 & 2047,
            width: self.texture_width(),
            height: self.texture_height(),
        }
    }

    /// Mirrored repeat on U
    pub fn u_mirror(&self) -> bool {
        self.0[2] & 0x02 != 0
    }

    /// Mirrored repeat on V
    pub fn v_mirror(&self) -> bool {
        self.0[2] & 0x01 != 0
    }

    /// Color comes from the 8-bit RGB field rather than the color table
    pub fn has_rgb_color(&self) -> bool {
        self.shape().contains(ShapeFlags::RGB_COLOR)
    }

    /// 8-bit RGB color from word 4
    pub fn rgb(&self) -> [u8; 3] {
        [
            (self.0[4] >> 24) as u8,
            (self.0[4] >> 16) as u8,
            (self.0[4] >> 8) as u8,
        ]
    }

    /// Color table index from word 4, bits 18-8
    pub fn color_index(&self) -> usize {
        ((self.0[4] >> 8) & 0x7FF) as usize
    }

    /// Word 4 bit 7
    pub fn modulate_disable_bit(&self) -> bool {
        self.0[4] & 0x80 != 0
    }

    /// Word 3 bit 7
    pub fn alternate_modulate_bit(&self) -> bool {
        self.0[3] & 0x80 != 0
    }

    /// 5-bit translucency level (0 = transparent, 31 = opaque)
    pub fn translucency(&self) -> u32 {
        (self.0[6] >> 18) & 0x1F
    }

    pub fn is_opaque(&self) -> bool {
        self.material().contains(MaterialFlags::OPAQUE)
    }

    pub fn is_luminous(&self) -> bool {
        self.material().contains(MaterialFlags::LUMINOUS)
    }

    /// 5-bit fog intensity for luminous polygons
    pub fn fog_intensity(&self) -> u32 {
        (self.0[6] >> 11) & 0x1F
    }

    /// Specular shininess, or `None` when specular lighting is off
    pub fn shininess(&self) -> Option<u32> {
        let shininess = (self.0[0] >> 26) & 0x3F;
        if self.0[0] & 0x80 == 0 || shininess == 0 {
            None
        } else {
            Some(shininess)
        }
    }

    /// Contour processing requested explicitly or implied by the texture format
    ///
    /// Only T1RGB5 is a real contour format. Alpha-carrying formats are treated
    /// as contour textures too so fully transparent texels are discarded.
    pub fn contour_processing(&self) -> bool {
        let material = self.material();
        let format = self.texture_format();
        material.contains(MaterialFlags::CONTOUR)
            || format == tex_format::RGBA4
            || (format == tex_format::A4L4_INTERLEAVED_LOW
                && material.contains(MaterialFlags::INTERLEAVE_LOW))
            || (format == tex_format::A4L4_INTERLEAVED_HIGH
                && material.contains(MaterialFlags::INTERLEAVE_HIGH))
    }

    /// Classify the polygon into a rendering pass
    ///
    /// Translucent polygons and RGBA4/A4L4 textures are alpha. The two
    /// interleaved A4L4 formats ignore the translucency bits entirely: their
    /// interleave select bit alone decides.
    ///
    /// # Examples
    ///
    /// ```
    /// use real3d::core::legacy3d::{PolygonHeader, PolyState};
    ///
    /// // Opaque, untextured
    /// let header = PolygonHeader([0, 0, 0, 0, 0, 0, 0x0080_0000]);
    /// assert_eq!(header.state(), PolyState::Opaque);
    ///
    /// // Opaque bit set but RGBA4 texture
    /// let header = PolygonHeader([0, 0, 0, 0, 0, 0, 0x0080_0000 | (7 << 7)]);
    /// assert_eq!(header.state(), PolyState::Alpha);
    /// ```
    pub fn state(&self) -> PolyState {
        let material = self.material();
        let format = self.texture_format();

        let alpha = match format {
            tex_format::A4L4_INTERLEAVED_LOW => material.contains(MaterialFlags::INTERLEAVE_LOW),
            tex_format::A4L4_INTERLEAVED_HIGH => {
                material.contains(MaterialFlags::INTERLEAVE_HIGH)
            }
            tex_format::RGBA4 | tex_format::A4L4 => true,
            _ => !material.contains(MaterialFlags::OPAQUE),
        };

        if alpha {
            PolyState::Alpha
        } else {
            PolyState::Opaque
        }
    }
}

/// A decoded vertex
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position in model space (already multiplied by the vertex factor)
    pub position: Vec3,
    /// Unit vertex normal
    pub normal: Vec3,
    /// Texture coordinates in texels
    pub uv: [f32; 2],
}

impl Vertex {
    /// Decode a vertex from its 4 stream words
    ///
    /// The low byte of each position word is a signed offset added to the
    /// polygon normal; the sum is renormalized.
    pub fn decode(words: &[u32], normal: &Vec3, vertex_factor: f32, uv_scale: f32) -> Self {
        let (ix, iy, iz, it) = (words[0], words[1], words[2], words[3]);

        let n = [
            normal[0] + (ix & 0xFF) as u8 as i8 as f32,
            normal[1] + (iy & 0xFF) as u8 as i8 as f32,
            normal[2] + (iz & 0xFF) as u8 as i8 as f32,
        ];

        Self {
            position: [
                ((ix as i32) >> 8) as f32 * vertex_factor,
                ((iy as i32) >> 8) as f32 * vertex_factor,
                ((iz as i32) >> 8) as f32 * vertex_factor,
            ],
            normal: normalize(&n),
            uv: [
                (it >> 16) as u16 as f32 * uv_scale,
                (it & 0xFFFF) as u16 as f32 * uv_scale,
            ],
        }
    }
}

/// A fully decoded polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Raw header
    pub header: PolygonHeader,
    /// Vertices; only the first `num_verts` are meaningful
    pub verts: [Vertex; 4],
    /// 3 or 4
    pub num_verts: usize,
    /// Polygon normal from the header
    pub normal: Vec3,
    /// Rendering pass
    pub state: PolyState,
}

impl Polygon {
    /// The polygon's vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.verts[..self.num_verts]
    }
}

/// Lazy decoder over a model's polygon stream
///
/// Yields each valid polygon in stream order. Polygons carrying the invalid
/// marker are decoded (so the stream stays aligned) but not yielded, and do not
/// update the reused-vertex history. Decoding stops at a terminator header,
/// after a polygon with the last-polygon bit, or with a single
/// [`EmulatorError::TruncatedModel`] if the stream runs out.
///
/// # Examples
///
/// ```
/// use real3d::core::legacy3d::PolygonDecoder;
///
/// // A terminator header only: no polygons
/// let words = [0u32; 7];
/// assert_eq!(PolygonDecoder::new(&words, 1.0).count(), 0);
/// ```
pub struct PolygonDecoder<'a> {
    words: &'a [u32],
    pos: usize,
    prev: [Vertex; 4],
    vertex_factor: f32,
    finished: bool,
}

impl<'a> PolygonDecoder<'a> {
    /// Create a decoder over `words` with an empty vertex history
    ///
    /// `vertex_factor` converts fixed-point positions into model units.
    pub fn new(words: &'a [u32], vertex_factor: f32) -> Self {
        Self {
            words,
            pos: 0,
            prev: [Vertex::default(); 4],
            vertex_factor,
            finished: false,
        }
    }

    /// Number of words consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, count: usize) -> Result<&'a [u32]> {
        let available = self.words.len().saturating_sub(self.pos);
        if available < count {
            return Err(EmulatorError::TruncatedModel {
                offset: self.pos,
                needed: count,
                available,
            });
        }
        let slice = &self.words[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn decode_next(&mut self) -> Result<Option<Polygon>> {
        loop {
            let mut header = PolygonHeader::default();
            header.0.copy_from_slice(self.take(HEADER_WORDS)?);
            if header.is_terminator() {
                return Ok(None);
            }
            if header.is_last() {
                self.finished = true;
            }

            let normal = header.normal();
            let uv_scale = header.uv_scale();
            let num_verts = header.num_verts();

            // Slot 3 of a triangle carries the previous value forward
            let mut verts = self.prev;

            // Reused vertices fill the lowest positions in mask-bit order
            let mut j = 0;
            for (i, prev) in self.prev.iter().enumerate() {
                if header.reuse_mask() & (1 << i) != 0 {
                    verts[j] = *prev;
                    j += 1;
                }
            }

            while j < num_verts {
                let words = self.take(VERTEX_WORDS)?;
                verts[j] = Vertex::decode(words, &normal, self.vertex_factor, uv_scale);
                j += 1;
            }

            if header.is_valid() {
                self.prev = verts;
                return Ok(Some(Polygon {
                    header,
                    verts,
                    num_verts,
                    normal,
                    state: header.state(),
                }));
            }

            log::trace!("Skipping invalid polygon at word {}", self.pos);
            if self.finished {
                return Ok(None);
            }
        }
    }
}

impl Iterator for PolygonDecoder<'_> {
    type Item = Result<Polygon>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.decode_next() {
            Ok(Some(polygon)) => Some(Ok(polygon)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
