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

//! Real3D legacy renderer
//!
//! This module turns the Sega Model 3 Real3D polygon format into backend
//! vertex buffers and replays per-frame display lists. The pieces, bottom up:
//!
//! - [`polygon`]: header accessors and the lazy [`PolygonDecoder`]
//! - [`vertex`]: the flat [`VboVertex`] uploaded to the backend
//! - [`cache`]: [`ModelCache`], decoded models keyed by LUT index and texture offset
//! - [`display_list`]: model instances and viewports in draw order
//! - `render`: display list replay against a [`GpuBackend`]
//! - [`frame`]: [`Legacy3D`], the static and dynamic caches and the frame protocol
//!
//! # Render States
//!
//! Every polygon is either opaque or alpha. A model's polygons are split by
//! state when cached, and each cache keeps one display list per state. A
//! frame draws all opaque geometry before any alpha geometry.
//!
//! # Winding
//!
//! The backend culls back faces, so front faces must reach it with a known
//! winding. Polygons are reordered to run clockwise as they are cached, and
//! each model instance gets a front face (or no culling) resolved from its
//! model-view matrix, since mirroring transforms flip the apparent winding.

pub mod backend;
pub mod cache;
pub mod context;
pub mod display_list;
pub mod frame;
pub mod geometry;
pub mod polygon;
mod render;
pub mod texture;
pub mod vertex;

#[cfg(test)]
mod tests;

pub use backend::{BackendCall, CullState, FrontFace, GpuBackend, RecordingBackend};
pub use cache::{CachedModel, ModelCache, ModelId, StagingHandle};
pub use context::{DecodeContext, ModulationSource, Transform, ViewportState};
pub use display_list::{DisplayList, VertexRange};
pub use frame::{FrameStats, Legacy3D, ModelRequest, ModelSource};
pub use geometry::{Mat4, Winding};
pub use polygon::{PolyState, Polygon, PolygonDecoder, PolygonHeader};
pub use texture::{TexSheet, TextureLog, TextureManager, TextureRef};
pub use vertex::VboVertex;
