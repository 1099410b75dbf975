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

//! Renderer configuration
//!
//! Capacities of the static and dynamic model caches and the tunable decoding
//! heuristics. Configuration is stored as TOML; every field has a default so a
//! partial file is enough.
//!
//! # Example
//!
//! ```toml
//! modulation = "word3_bit7"
//!
//! [static_cache]
//! vbo_vertices = 400000
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::Result;
use super::legacy3d::ModulationSource;

/// Capacities of one model cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLimits {
    /// Requested vertex buffer size in vertices (may shrink at allocation)
    pub vbo_vertices: usize,
    /// Staging buffer size per render state, in vertices
    pub staging_vertices: usize,
    /// Maximum number of cached models
    pub max_models: usize,
    /// Number of LUT entries (range of model LUT indices)
    pub lut_entries: usize,
    /// Maximum number of display list nodes
    pub display_list_entries: usize,
}

impl CacheLimits {
    /// Defaults for the cache holding VROM models, which persist across frames
    pub const STATIC: CacheLimits = CacheLimits {
        vbo_vertices: 700_000,
        staging_vertices: 32_768,
        max_models: 10_000,
        lut_entries: 0x40_0000,
        display_list_entries: 10_000,
    };

    /// Defaults for the cache holding polygon RAM models, rebuilt every frame
    pub const DYNAMIC: CacheLimits = CacheLimits {
        vbo_vertices: 100_000,
        staging_vertices: 32_768,
        max_models: 1_024,
        lut_entries: 0x4_0000,
        display_list_entries: 10_000,
    };
}

/// A `[*_cache]` table where every field is optional
#[derive(Deserialize)]
struct LimitOverrides {
    vbo_vertices: Option<usize>,
    staging_vertices: Option<usize>,
    max_models: Option<usize>,
    lut_entries: Option<usize>,
    display_list_entries: Option<usize>,
}

impl LimitOverrides {
    fn apply(self, base: CacheLimits) -> CacheLimits {
        CacheLimits {
            vbo_vertices: self.vbo_vertices.unwrap_or(base.vbo_vertices),
            staging_vertices: self.staging_vertices.unwrap_or(base.staging_vertices),
            max_models: self.max_models.unwrap_or(base.max_models),
            lut_entries: self.lut_entries.unwrap_or(base.lut_entries),
            display_list_entries: self
                .display_list_entries
                .unwrap_or(base.display_list_entries),
        }
    }
}

// Missing fields of a partial table fall back to that cache's own defaults
fn static_limits<'de, D>(deserializer: D) -> std::result::Result<CacheLimits, D::Error>
where
    D: Deserializer<'de>,
{
    LimitOverrides::deserialize(deserializer).map(|o| o.apply(CacheLimits::STATIC))
}

fn dynamic_limits<'de, D>(deserializer: D) -> std::result::Result<CacheLimits, D::Error>
where
    D: Deserializer<'de>,
{
    LimitOverrides::deserialize(deserializer).map(|o| o.apply(CacheLimits::DYNAMIC))
}

/// Legacy renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Legacy3DConfig {
    /// Limits for the static (VROM) model cache
    #[serde(deserialize_with = "static_limits")]
    pub static_cache: CacheLimits,
    /// Limits for the dynamic (polygon RAM) model cache
    #[serde(deserialize_with = "dynamic_limits")]
    pub dynamic_cache: CacheLimits,
    /// Header bit used to decide texel color modulation
    pub modulation: ModulationSource,
    /// Scale from fixed-point vertex positions to model units
    pub vertex_factor: f32,
}

impl Default for Legacy3DConfig {
    fn default() -> Self {
        Self {
            static_cache: CacheLimits::STATIC,
            dynamic_cache: CacheLimits::DYNAMIC,
            modulation: ModulationSource::default(),
            vertex_factor: 1.0 / 128.0,
        }
    }
}

impl Legacy3DConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration from `path`, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            log::info!(
                "Using default renderer config (failed to load {}: {})",
                path.display(),
                e
            );
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
