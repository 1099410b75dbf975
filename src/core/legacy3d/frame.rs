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

//! Frame driver
//!
//! [`Legacy3D`] owns the two model caches and runs the per-frame protocol:
//!
//! 1. [`Legacy3D::begin_frame`] empties the display lists and the dynamic cache
//! 2. The scene walker calls [`Legacy3D::set_viewport`] and
//!    [`Legacy3D::draw_model`] in scene order
//! 3. [`Legacy3D::render_frame`] replays static opaque, dynamic opaque,
//!    static alpha and dynamic alpha
//!
//! Models read from VROM go to the static cache and stay cached across
//! frames. Models read from polygon RAM can change at any time and go to the
//! dynamic cache, which is rebuilt every frame.

use serde::Serialize;

use super::backend::GpuBackend;
use super::cache::{ModelCache, ModelId};
use super::context::{DecodeContext, Transform, ViewportState};
use super::polygon::PolyState;
use super::texture::TextureManager;
use crate::core::config::Legacy3DConfig;
use crate::core::error::{EmulatorError, Result};

/// Where a model's polygon data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// VROM, immutable once loaded
    Static,
    /// Polygon RAM, writable by the game
    Dynamic,
}

/// A model instance to draw
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub source: ModelSource,
    /// LUT index (the model's address in its memory region)
    pub lut_idx: u32,
    /// Texture offset word from the scene node
    pub tex_offset: u16,
    /// Texture offset in texels, applied to every polygon's texture base
    pub tex_offset_xy: [i32; 2],
    /// The model's polygon stream
    pub words: &'a [u32],
    /// Polygon RAM, for color-table lookups
    pub polygon_ram: &'a [u32],
}

/// Counters for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Models decoded and uploaded
    pub models_cached: u32,
    /// Models found already cached
    pub cache_hits: u32,
    /// Polygons decoded into the caches
    pub polygons_inserted: u64,
    /// Static cache clears caused by running out of space
    pub static_clears: u32,
    /// Dynamic cache clears caused by running out of space
    pub dynamic_clears: u32,
}

/// The legacy renderer's model caches and frame protocol
#[derive(Debug)]
pub struct Legacy3D {
    config: Legacy3DConfig,
    static_cache: ModelCache,
    dynamic_cache: ModelCache,
    /// Last viewport set this frame, replayed after a mid-frame clear
    viewport: Option<ViewportState>,
    stats: FrameStats,
}

impl Legacy3D {
    /// Create both caches
    pub fn new(backend: &mut dyn GpuBackend, config: Legacy3DConfig) -> Result<Self> {
        let static_cache = ModelCache::create(backend, &config.static_cache, false)?;
        let dynamic_cache = match ModelCache::create(backend, &config.dynamic_cache, true) {
            Ok(cache) => cache,
            Err(e) => {
                static_cache.destroy(backend);
                return Err(e);
            }
        };

        Ok(Self {
            config,
            static_cache,
            dynamic_cache,
            viewport: None,
            stats: FrameStats::default(),
        })
    }

    /// Release both caches' buffers
    pub fn destroy(self, backend: &mut dyn GpuBackend) {
        self.static_cache.destroy(backend);
        self.dynamic_cache.destroy(backend);
    }

    pub fn config(&self) -> &Legacy3DConfig {
        &self.config
    }

    pub fn cache(&self, source: ModelSource) -> &ModelCache {
        match source {
            ModelSource::Static => &self.static_cache,
            ModelSource::Dynamic => &self.dynamic_cache,
        }
    }

    /// Counters accumulated since the last `begin_frame`
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Start a new frame
    pub fn begin_frame(&mut self) {
        self.static_cache.clear_display_list();
        self.dynamic_cache.clear();
        self.viewport = None;
        self.stats = FrameStats::default();
    }

    /// Record a viewport change in both caches
    ///
    /// Either both display lists take the viewport or neither does. On
    /// `DisplayListFull` the previous viewport stays current.
    pub fn set_viewport(&mut self, viewport: &ViewportState) -> Result<()> {
        for cache in [&self.static_cache, &self.dynamic_cache] {
            if !cache.display_list().has_room() {
                log::warn!(
                    "{} display list full, viewport dropped",
                    if cache.is_dynamic() { "dynamic" } else { "static" }
                );
                return Err(EmulatorError::DisplayListFull);
            }
        }
        self.static_cache.append_viewport(viewport)?;
        self.dynamic_cache.append_viewport(viewport)?;
        self.viewport = Some(*viewport);
        Ok(())
    }

    /// Draw a model instance, caching it first if needed
    ///
    /// When the target cache runs out of space it is cleared and the model is
    /// cached again. A second failure is returned. Clearing the static cache
    /// drops the static instances already appended this frame.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend owning both vertex buffers
    /// * `textures` - Texture manager for the model's texture references
    /// * `request` - Which model to draw and where its polygon data lives
    /// * `transform` - Model-view matrix and Z sign of this instance
    ///
    /// # Returns
    ///
    /// - `Ok(ModelId)` of the model in its cache, cached or hit
    /// - `Err` if the model cannot be cached or appended even after a clear,
    ///   or on any unrecoverable error
    pub fn draw_model(
        &mut self,
        backend: &mut dyn GpuBackend,
        textures: &mut dyn TextureManager,
        request: &ModelRequest<'_>,
        transform: &Transform,
    ) -> Result<ModelId> {
        let ctx = DecodeContext {
            vertex_factor: self.config.vertex_factor,
            z_sign: transform.z_sign,
            tex_offset_xy: request.tex_offset_xy,
            polygon_ram: request.polygon_ram,
            modulation: self.config.modulation,
            ..DecodeContext::default()
        }
        .with_sheets_from(&*textures);

        let viewport = self.viewport;
        let stats = &mut self.stats;
        let cache = match request.source {
            ModelSource::Static => &mut self.static_cache,
            ModelSource::Dynamic => &mut self.dynamic_cache,
        };

        match draw_into(cache, stats, backend, textures, &ctx, request, transform) {
            Err(e) if e.is_recoverable() => {
                log::warn!(
                    "{:?} model cache: {}, clearing and retrying",
                    request.source,
                    e
                );
                cache.clear();
                match request.source {
                    ModelSource::Static => stats.static_clears += 1,
                    ModelSource::Dynamic => stats.dynamic_clears += 1,
                }
                if let Some(viewport) = viewport {
                    cache.append_viewport(&viewport)?;
                }
                draw_into(cache, stats, backend, textures, &ctx, request, transform)
            }
            result => result,
        }
    }

    /// Decode the textures referenced by every static model
    ///
    /// Called after texture RAM changes so deferred references are resolved.
    pub fn refresh_static_textures(&self, textures: &mut dyn TextureManager) {
        for id in self.static_cache.model_ids() {
            self.static_cache.decode_textures(id, textures);
        }
    }

    /// Replay the frame's display lists
    pub fn render_frame(&self, backend: &mut dyn GpuBackend) {
        for state in PolyState::ALL {
            self.static_cache.draw(backend, state);
            self.dynamic_cache.draw(backend, state);
        }
    }
}

fn draw_into(
    cache: &mut ModelCache,
    stats: &mut FrameStats,
    backend: &mut dyn GpuBackend,
    textures: &mut dyn TextureManager,
    ctx: &DecodeContext<'_>,
    request: &ModelRequest<'_>,
    transform: &Transform,
) -> Result<ModelId> {
    let id = match cache.look_up(request.lut_idx, request.tex_offset) {
        Some(id) => {
            stats.cache_hits += 1;
            id
        }
        None => {
            let before = cache.polygons_inserted();
            let cached = cache.cache_model(
                backend,
                textures,
                ctx,
                request.lut_idx,
                request.tex_offset,
                request.words,
            );
            stats.polygons_inserted += cache.polygons_inserted() - before;
            let id = cached?;
            stats.models_cached += 1;
            id
        }
    };

    cache.append_model(id, transform)?;
    Ok(id)
}
