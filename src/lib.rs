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

//! real3d: Sega Model 3 Real3D legacy renderer
//!
//! This crate decodes Real3D polygon data into backend vertex buffers, caches
//! decoded models across frames, and compiles per-frame display lists that are
//! replayed against an abstract graphics backend.
//!
//! # Architecture
//!
//! - [`core::legacy3d`]: polygon decoding, model caches, display lists, rendering
//! - [`core::config`]: cache capacities and decoding heuristics (TOML)
//! - [`core::error`]: the crate error type
//!
//! # Example
//!
//! ```
//! use real3d::core::config::{CacheLimits, Legacy3DConfig};
//! use real3d::core::legacy3d::{
//!     Legacy3D, ModelRequest, ModelSource, RecordingBackend, TextureLog, Transform,
//! };
//!
//! let limits = CacheLimits {
//!     vbo_vertices: 1024,
//!     staging_vertices: 64,
//!     max_models: 16,
//!     lut_entries: 16,
//!     display_list_entries: 16,
//! };
//! let config = Legacy3DConfig {
//!     static_cache: limits,
//!     dynamic_cache: limits,
//!     ..Legacy3DConfig::default()
//! };
//!
//! let mut backend = RecordingBackend::new();
//! let mut textures = TextureLog::new(16);
//! let mut renderer = Legacy3D::new(&mut backend, config)?;
//!
//! // A model holding only a terminator header
//! let words = [0u32; 7];
//! renderer.begin_frame();
//! renderer.draw_model(
//!     &mut backend,
//!     &mut textures,
//!     &ModelRequest {
//!         source: ModelSource::Static,
//!         lut_idx: 3,
//!         tex_offset: 0,
//!         tex_offset_xy: [0, 0],
//!         words: &words,
//!         polygon_ram: &[],
//!     },
//!     &Transform::default(),
//! )?;
//! renderer.render_frame(&mut backend);
//! assert!(backend.draws().is_empty());
//! # Ok::<(), real3d::EmulatorError>(())
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, EmulatorError>`. Capacity errors are recoverable by clearing the
//! affected cache; see [`EmulatorError::is_recoverable`].

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
