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

//! Model cache
//!
//! Decoded models are stored in a single backend vertex buffer and found again
//! through a lookup table keyed by the model's LUT index (its address in the
//! scene database). Identical geometry drawn with different texture offsets is
//! cached once per offset; variants sharing a LUT index are chained, newest
//! first.
//!
//! # Caching Sequence
//!
//! ```text
//! look_up(lut, tex_offset) ── hit ──────────────────────────┐
//!          │ miss                                           v
//! begin_model ─> insert_polygon × N ─> end_model ─> append_model
//! ```
//!
//! While a model is being built its vertices accumulate in two host staging
//! buffers, one per render state, and vertex buffer space is reserved as they
//! are inserted. `end_model` uploads the opaque vertices followed immediately
//! by the alpha vertices, so the two ranges of a model are contiguous.
//!
//! # Capacity
//!
//! The cache never grows. [`EmulatorError::ModelCacheFull`],
//! [`EmulatorError::VertexBufferOverflow`] and
//! [`EmulatorError::DisplayListFull`] mean the cache must be cleared with
//! [`ModelCache::clear`] and the frame's models cached again.

use super::backend::{BufferHandle, BufferUsage, GpuBackend};
use super::context::{DecodeContext, Transform, ViewportState};
use super::display_list::{DisplayList, VertexRange};
use super::geometry::polygon_is_clockwise;
use super::polygon::{PolyState, Polygon, PolygonDecoder};
use super::texture::{TextureManager, TextureRef};
use super::vertex::VboVertex;
use crate::core::config::CacheLimits;
use crate::core::error::{EmulatorError, Result};

/// Worst case vertex count of one polygon: a double-sided quad
const MAX_POLYGON_VERTS: usize = 6 * 2;

/// Index of a cached model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// Proof that a model is being staged
///
/// Returned by [`ModelCache::begin_model`] and consumed by
/// [`ModelCache::end_model`] or [`ModelCache::abandon_model`].
#[derive(Debug)]
pub struct StagingHandle {
    slot: u32,
    first_vertex: u32,
}

/// A cached model
#[derive(Debug, Clone, PartialEq)]
pub struct CachedModel {
    /// Vertex ranges, indexed by [`PolyState::index`]
    pub ranges: [VertexRange; 2],
    /// Textures referenced by the model (static caches only)
    pub texture_refs: Vec<TextureRef>,
    /// LUT index the model was cached under
    pub lut_idx: u32,
    /// Texture offset the model was cached with
    pub tex_offset: u16,
    /// Previously cached variant with the same LUT index
    pub next_variant: Option<ModelId>,
}

impl CachedModel {
    /// Vertex range for one render state
    pub fn range(&self, state: PolyState) -> VertexRange {
        self.ranges[state.index()]
    }
}

/// Fixed-capacity cache of decoded models and their display lists
#[derive(Debug)]
pub struct ModelCache {
    dynamic: bool,

    /// Backend vertex buffer and its size in vertices
    pub(crate) vbo: BufferHandle,
    vbo_capacity: usize,

    /// Next free vertex in the vertex buffer
    vbo_cursor: usize,

    /// Host staging buffers, indexed by render state
    staging: [Vec<VboVertex>; 2],
    staging_capacity: usize,

    /// Texture references collected for the model being staged
    staged_textures: Vec<TextureRef>,

    /// Slot of the model being staged
    in_progress: Option<u32>,

    models: Vec<CachedModel>,
    max_models: usize,

    /// LUT index -> newest cached variant
    lut: Vec<Option<u32>>,

    pub(crate) display_list: DisplayList,

    /// Polygons inserted since creation
    polygons_inserted: u64,
}

impl ModelCache {
    /// Create a model cache and allocate its vertex buffer
    ///
    /// The backend is first asked for `limits.vbo_vertices` vertices. On
    /// failure the request shrinks by one staging buffer's worth at a time;
    /// when it drops below a single staging buffer, that size is tried once
    /// more before giving up.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend providing the vertex buffer
    /// * `limits` - Vertex, model, LUT and display list capacities
    /// * `dynamic` - Polygon RAM cache (rebuilt every frame) rather than VROM
    ///
    /// # Returns
    ///
    /// - `Ok(ModelCache)` with an empty LUT and display lists
    /// - `Err(EmulatorError::BufferAllocation)` if no buffer size was accepted
    pub fn create(backend: &mut dyn GpuBackend, limits: &CacheLimits, dynamic: bool) -> Result<Self> {
        let usage = if dynamic {
            BufferUsage::Stream
        } else {
            BufferUsage::Static
        };
        let kind = if dynamic { "Dynamic" } else { "Static" };

        let staging_bytes = limits.staging_vertices * VboVertex::SIZE;
        let mut vbo_bytes = limits.vbo_vertices * VboVertex::SIZE;
        let mut vbo = None;

        while staging_bytes > 0 && vbo_bytes >= staging_bytes {
            match backend.allocate_buffer(vbo_bytes, usage) {
                Ok(handle) => {
                    vbo = Some(handle);
                    break;
                }
                Err(e) => log::debug!("{} vertex buffer: {}, retrying smaller", kind, e),
            }
            vbo_bytes -= staging_bytes;
        }

        let vbo = match vbo {
            Some(handle) => handle,
            None => {
                vbo_bytes = staging_bytes;
                backend
                    .allocate_buffer(vbo_bytes, usage)
                    .map_err(|_| EmulatorError::BufferAllocation {
                        dynamic,
                        bytes: vbo_bytes,
                    })?
            }
        };

        log::info!(
            "{} vertex buffer size: {:.2} MB",
            kind,
            vbo_bytes as f32 / 0x10_0000 as f32
        );

        Ok(Self {
            dynamic,
            vbo,
            vbo_capacity: vbo_bytes / VboVertex::SIZE,
            vbo_cursor: 0,
            staging: [
                Vec::with_capacity(limits.staging_vertices),
                Vec::with_capacity(limits.staging_vertices),
            ],
            staging_capacity: limits.staging_vertices,
            staged_textures: Vec::new(),
            in_progress: None,
            models: Vec::with_capacity(limits.max_models),
            max_models: limits.max_models,
            lut: vec![None; limits.lut_entries],
            display_list: DisplayList::new(limits.display_list_entries),
            polygons_inserted: 0,
        })
    }

    /// Release the vertex buffer
    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        backend.release_buffer(self.vbo);
    }

    /// True for the per-frame cache of polygon RAM models
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Number of cached models
    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    /// Vertex buffer capacity actually obtained, in vertices
    pub fn vbo_capacity(&self) -> usize {
        self.vbo_capacity
    }

    /// Vertices reserved in the vertex buffer so far
    pub fn vbo_used(&self) -> usize {
        self.vbo_cursor
    }

    /// Vertices currently staged for one render state
    pub fn staged_vertices(&self, state: PolyState) -> usize {
        self.staging[state.index()].len()
    }

    /// Polygons inserted since the cache was created, including those of
    /// models later abandoned or cleared
    pub fn polygons_inserted(&self) -> u64 {
        self.polygons_inserted
    }

    /// Ids of all cached models, oldest first
    pub fn model_ids(&self) -> impl Iterator<Item = ModelId> {
        (0..self.models.len() as u32).map(ModelId)
    }

    /// Number of LUT entries
    pub fn lut_size(&self) -> usize {
        self.lut.len()
    }

    /// A cached model
    ///
    /// Returns `None` if `id` did not come from this cache since its last
    /// clear.
    pub fn model(&self, id: ModelId) -> Option<&CachedModel> {
        self.models.get(id.0 as usize)
    }

    /// The cache's display lists
    pub fn display_list(&self) -> &DisplayList {
        &self.display_list
    }

    /// Find the model cached under `lut_idx` with `tex_offset`
    ///
    /// Returns `None` if nothing is cached for that key, including LUT
    /// indices outside the table.
    pub fn look_up(&self, lut_idx: u32, tex_offset: u16) -> Option<ModelId> {
        let mut cursor = (*self.lut.get(lut_idx as usize)?)?;
        loop {
            let model = &self.models[cursor as usize];
            if model.tex_offset == tex_offset {
                return Some(ModelId(cursor));
            }
            cursor = model.next_variant?.0;
        }
    }

    /// Start staging a new model
    pub fn begin_model(&mut self) -> Result<StagingHandle> {
        if self.in_progress.is_some() {
            return Err(EmulatorError::StagingInProgress);
        }
        if self.models.len() >= self.max_models {
            return Err(EmulatorError::ModelCacheFull);
        }

        for staging in &mut self.staging {
            staging.clear();
        }
        self.staged_textures.clear();

        let slot = self.models.len() as u32;
        self.in_progress = Some(slot);
        Ok(StagingHandle {
            slot,
            first_vertex: self.vbo_cursor as u32,
        })
    }

    fn check_handle(&self, handle: &StagingHandle) -> Result<()> {
        if self.in_progress != Some(handle.slot) {
            return Err(EmulatorError::NoModelInProgress);
        }
        Ok(())
    }

    fn push_vertex(&mut self, polygon: &Polygon, index: usize, normal_flip: f32, ctx: &DecodeContext<'_>) {
        let vertex = VboVertex::from_polygon(polygon, &polygon.verts[index], normal_flip, ctx);
        self.staging[polygon.state.index()].push(vertex);
        self.vbo_cursor += 1;
    }

    /// Triangulate a polygon into the staging buffer for its render state
    ///
    /// Vertices are emitted clockwise: if the polygon's own vertex order runs
    /// against its normal, it is reversed. Quads are split along the 0-2
    /// diagonal. Double-sided polygons get a mirrored copy with reversed
    /// winding and negated normals.
    ///
    /// # Arguments
    ///
    /// * `handle` - Handle from [`ModelCache::begin_model`]
    /// * `polygon` - Decoded polygon; its state picks the staging buffer
    /// * `ctx` - Decode context supplying Z sign, modulation and texture sheets
    ///
    /// # Returns
    ///
    /// - `Ok(())` once 3 to 12 vertices are staged
    /// - `Err(EmulatorError::StagingBufferOverflow)` if the staging buffer
    ///   cannot take a worst-case polygon
    /// - `Err(EmulatorError::VertexBufferOverflow)` if the vertex buffer cannot
    /// - `Err(EmulatorError::NoModelInProgress)` for a stale handle
    pub fn insert_polygon(
        &mut self,
        handle: &StagingHandle,
        polygon: &Polygon,
        ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        self.check_handle(handle)?;

        let state = polygon.state;
        let staged = self.staging[state.index()].len();
        if staged + MAX_POLYGON_VERTS >= self.staging_capacity {
            log::warn!(
                "{} staging buffer overflow ({} of {} vertices)",
                state,
                staged,
                self.staging_capacity
            );
            return Err(EmulatorError::StagingBufferOverflow {
                state,
                needed: staged + MAX_POLYGON_VERTS,
                capacity: self.staging_capacity,
            });
        }
        if self.vbo_cursor + MAX_POLYGON_VERTS >= self.vbo_capacity {
            return Err(EmulatorError::VertexBufferOverflow);
        }

        let v = &polygon.verts;
        let clockwise = polygon_is_clockwise(
            &v[0].position,
            &v[1].position,
            &v[2].position,
            &polygon.normal,
            ctx.z_sign,
        );

        let (front, back, quad_front, quad_back) = if clockwise {
            ([0, 1, 2], [2, 1, 0], [0, 2, 3], [0, 3, 2])
        } else {
            ([2, 1, 0], [0, 1, 2], [0, 3, 2], [0, 2, 3])
        };
        let double_sided = polygon.header.is_double_sided();

        for i in front {
            self.push_vertex(polygon, i, 1.0, ctx);
        }
        if double_sided {
            for i in back {
                self.push_vertex(polygon, i, -1.0, ctx);
            }
        }

        if polygon.num_verts == 4 {
            for i in quad_front {
                self.push_vertex(polygon, i, 1.0, ctx);
            }
            if double_sided {
                for i in quad_back {
                    self.push_vertex(polygon, i, -1.0, ctx);
                }
            }
        }

        self.polygons_inserted += 1;
        Ok(())
    }

    /// Make the texture of a polygon available
    ///
    /// Static caches keep a deferred reference when the texture manager
    /// accepts one. Dynamic caches, and references the manager cannot
    /// record, decode immediately.
    pub fn request_texture(
        &mut self,
        handle: &StagingHandle,
        tex: &TextureRef,
        textures: &mut dyn TextureManager,
    ) -> Result<()> {
        self.check_handle(handle)?;

        if !self.dynamic && textures.add_ref(tex) {
            if !self.staged_textures.contains(tex) {
                self.staged_textures.push(*tex);
            }
        } else {
            textures.decode_texture(tex);
        }
        Ok(())
    }

    /// Upload the staged model and enter it into the LUT
    ///
    /// The new model becomes the head of its LUT chain, ahead of any other
    /// texture-offset variant.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend owning the vertex buffer
    /// * `handle` - Handle from [`ModelCache::begin_model`], consumed
    /// * `lut_idx` - LUT index the model is cached under
    /// * `tex_offset` - Texture offset word distinguishing variants
    ///
    /// # Returns
    ///
    /// - `Ok(ModelId)` of the cached model
    /// - `Err(EmulatorError::LutIndexOutOfRange)` if `lut_idx` is outside the
    ///   table; the staged model is abandoned
    /// - `Err(EmulatorError::NoModelInProgress)` for a stale handle
    pub fn end_model(
        &mut self,
        backend: &mut dyn GpuBackend,
        handle: StagingHandle,
        lut_idx: u32,
        tex_offset: u16,
    ) -> Result<ModelId> {
        self.check_handle(&handle)?;
        if lut_idx as usize >= self.lut.len() {
            let size = self.lut.len();
            self.abandon_model(handle);
            return Err(EmulatorError::LutIndexOutOfRange {
                index: lut_idx,
                size,
            });
        }

        let opaque = &self.staging[PolyState::Opaque.index()];
        let alpha = &self.staging[PolyState::Alpha.index()];

        // Alpha vertices directly follow the opaque ones
        let ranges = [
            VertexRange {
                first: handle.first_vertex,
                count: opaque.len() as u32,
            },
            VertexRange {
                first: handle.first_vertex + opaque.len() as u32,
                count: alpha.len() as u32,
            },
        ];

        for (range, staged) in ranges.iter().zip([opaque, alpha]) {
            if range.count > 0 {
                backend.upload_sub_data(
                    self.vbo,
                    range.first as usize * VboVertex::SIZE,
                    bytemuck::cast_slice(staged.as_slice()),
                );
            }
        }

        let slot = handle.slot;
        let next_variant = self.lut[lut_idx as usize].map(ModelId);
        self.lut[lut_idx as usize] = Some(slot);

        self.models.push(CachedModel {
            ranges,
            texture_refs: std::mem::take(&mut self.staged_textures),
            lut_idx,
            tex_offset,
            next_variant,
        });
        self.in_progress = None;

        log::trace!(
            "Cached model 0x{:X}/{:04X}: {} opaque, {} alpha vertices",
            lut_idx,
            tex_offset,
            ranges[0].count,
            ranges[1].count
        );

        Ok(ModelId(slot))
    }

    /// Drop the model being staged and release its vertex buffer reservation
    pub fn abandon_model(&mut self, handle: StagingHandle) {
        if self.in_progress != Some(handle.slot) {
            return;
        }
        self.vbo_cursor = handle.first_vertex as usize;
        for staging in &mut self.staging {
            staging.clear();
        }
        self.staged_textures.clear();
        self.in_progress = None;
    }

    /// Decode and cache a complete model from its polygon stream
    ///
    /// On any error the partially staged model is abandoned. Capacity errors
    /// are recoverable by clearing the cache and caching again.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend owning the vertex buffer
    /// * `textures` - Texture manager receiving each textured polygon's reference
    /// * `ctx` - Decode context
    /// * `lut_idx` - LUT index to cache the model under
    /// * `tex_offset` - Texture offset word distinguishing variants
    /// * `words` - Polygon stream, up to and including the terminator
    ///
    /// # Returns
    ///
    /// - `Ok(ModelId)` of the cached model
    /// - `Err` with the first decode, capacity or LUT error
    pub fn cache_model(
        &mut self,
        backend: &mut dyn GpuBackend,
        textures: &mut dyn TextureManager,
        ctx: &DecodeContext<'_>,
        lut_idx: u32,
        tex_offset: u16,
        words: &[u32],
    ) -> Result<ModelId> {
        let handle = self.begin_model()?;
        match self.stage_polygons(&handle, textures, ctx, words) {
            Ok(()) => self.end_model(backend, handle, lut_idx, tex_offset),
            Err(e) => {
                self.abandon_model(handle);
                Err(e)
            }
        }
    }

    fn stage_polygons(
        &mut self,
        handle: &StagingHandle,
        textures: &mut dyn TextureManager,
        ctx: &DecodeContext<'_>,
        words: &[u32],
    ) -> Result<()> {
        for polygon in PolygonDecoder::new(words, ctx.vertex_factor) {
            let polygon = polygon?;
            if polygon.header.texture_enabled() {
                let tex = polygon.header.texture_ref(ctx.tex_offset_xy);
                self.request_texture(handle, &tex, textures)?;
            }
            self.insert_polygon(handle, &polygon, ctx)?;
        }
        Ok(())
    }

    /// Decode every texture a cached model references
    ///
    /// Does nothing for an unknown id.
    pub fn decode_textures(&self, id: ModelId, textures: &mut dyn TextureManager) {
        let Some(model) = self.model(id) else {
            return;
        };
        for tex in &model.texture_refs {
            textures.decode_texture(tex);
        }
    }

    /// Append an instance of a cached model to the display lists
    ///
    /// # Errors
    ///
    /// `UnknownModel` if `id` is stale (the cache was cleared after it was
    /// issued), `DisplayListFull` if fewer than two nodes are free.
    pub fn append_model(&mut self, id: ModelId, transform: &Transform) -> Result<()> {
        let ranges = self
            .model(id)
            .ok_or(EmulatorError::UnknownModel { id: id.0 })?
            .ranges;
        self.display_list.append_model(&ranges, transform)
    }

    /// Append a viewport snapshot to both display lists
    pub fn append_viewport(&mut self, viewport: &ViewportState) -> Result<()> {
        self.display_list.append_viewport(viewport)
    }

    /// Empty the display lists for a new frame
    pub fn clear_display_list(&mut self) {
        self.display_list.clear();
    }

    /// Discard every cached model and the display lists
    pub fn clear(&mut self) {
        log::debug!(
            "Clearing {} model cache ({} models, {} vertices)",
            if self.dynamic { "dynamic" } else { "static" },
            self.models.len(),
            self.vbo_cursor
        );

        self.vbo_cursor = 0;
        for staging in &mut self.staging {
            staging.clear();
        }
        self.staged_textures.clear();
        self.in_progress = None;
        for model in &self.models {
            self.lut[model.lut_idx as usize] = None;
        }
        self.models.clear();
        self.display_list.clear();
    }
}
