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

//! Polygon stream builders for tests

use crate::core::config::CacheLimits;
use crate::core::legacy3d::context::DecodeContext;
use crate::core::legacy3d::polygon::{MaterialFlags, PolygonHeader, ShapeFlags};

/// Header with word 6 clear, ending a model
pub const TERMINATOR: [u32; 7] = [0; 7];

/// Encode a vertex for a decoder using a vertex factor of 1/256
pub fn vertex_words(position: [f32; 3], uv: [u16; 2]) -> [u32; 4] {
    let fixed = |v: f32| (((v * 256.0) as i32) << 8) as u32;
    [
        fixed(position[0]),
        fixed(position[1]),
        fixed(position[2]),
        ((uv[0] as u32) << 16) | uv[1] as u32,
    ]
}

/// Cache limits small enough for host-memory tests
pub fn small_limits() -> CacheLimits {
    CacheLimits {
        vbo_vertices: 4096,
        staging_vertices: 256,
        max_models: 64,
        lut_entries: 256,
        display_list_entries: 64,
    }
}

/// Decode context matching [`vertex_words`]
pub fn decode_context() -> DecodeContext<'static> {
    DecodeContext {
        vertex_factor: 1.0 / 256.0,
        ..DecodeContext::default()
    }
}

/// Builder for polygon headers
///
/// Starts from an opaque, untextured polygon facing -Z.
#[derive(Debug, Clone)]
pub struct PolyBuilder {
    words: [u32; 7],
    normal: [f32; 3],
}

impl PolyBuilder {
    pub fn triangle() -> Self {
        Self {
            words: [0, 0, 0, 0, 0, 0, MaterialFlags::OPAQUE.bits()],
            normal: [0.0, 0.0, -1.0],
        }
    }

    pub fn quad() -> Self {
        let mut builder = Self::triangle();
        builder.words[0] |= 0x40;
        builder
    }

    pub fn reuse(mut self, mask: u32) -> Self {
        self.words[0] = (self.words[0] & !0xF) | (mask & 0xF);
        self
    }

    pub fn invalid(mut self) -> Self {
        self.words[0] |= 0x300;
        self
    }

    pub fn last(mut self) -> Self {
        self.words[1] |= ShapeFlags::LAST.bits();
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.words[1] |= ShapeFlags::DOUBLE_SIDED.bits();
        self
    }

    pub fn uv_full(mut self) -> Self {
        self.words[1] |= ShapeFlags::FULL_UV_SCALE.bits();
        self
    }

    pub fn normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = normal;
        self
    }

    /// Clear the opaque bit and set a mid translucency level
    pub fn translucent(mut self) -> Self {
        self.words[6] &= !MaterialFlags::OPAQUE.bits();
        self.words[6] |= 0x10 << 18;
        self
    }

    /// Enable texturing with a 6-bit X base and 5-bit Y base, in 32-texel units
    pub fn texture(mut self, format: u32, x: u32, y: u32, width_code: u32, height_code: u32) -> Self {
        self.words[6] |= MaterialFlags::TEXTURE.bits() | ((format & 7) << 7);
        self.words[4] = (self.words[4] & !0x1F) | ((x >> 1) & 0x1F);
        self.words[5] = (self.words[5] & !0x9F) | ((x & 1) << 7) | (y & 0x1F);
        self.words[3] = (self.words[3] & !0x3F) | ((width_code & 7) << 3) | (height_code & 7);
        self
    }

    /// Select the upper texture page
    pub fn page(mut self) -> Self {
        self.words[4] |= 0x40;
        self
    }

    pub fn build(&self) -> PolygonHeader {
        let mut words = self.words;
        for (word, n) in words[1..4].iter_mut().zip(self.normal) {
            let fixed = (n * 4_194_304.0) as i32;
            *word = (*word & 0xFF) | ((fixed << 8) as u32);
        }
        PolygonHeader(words)
    }

    pub fn header_words(&self) -> Vec<u32> {
        self.build().0.to_vec()
    }
}

fn single_triangle(builder: PolyBuilder) -> Vec<u32> {
    let mut words = builder.header_words();
    for position in [[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]] {
        words.extend(vertex_words(position, [0, 0]));
    }
    words.extend(TERMINATOR);
    words
}

/// One opaque, clockwise triangle
pub fn triangle_model() -> Vec<u32> {
    single_triangle(PolyBuilder::triangle())
}

/// One translucent triangle
pub fn translucent_triangle_model() -> Vec<u32> {
    single_triangle(PolyBuilder::triangle().translucent())
}

/// One opaque triangle with a 64×64 T1RGB5 texture
pub fn textured_triangle_model() -> Vec<u32> {
    single_triangle(PolyBuilder::triangle().texture(0, 2, 3, 1, 1))
}
