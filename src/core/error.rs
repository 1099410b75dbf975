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

//! Error types for the Real3D legacy renderer
//!
//! All fallible operations in this crate return [`Result<T>`], an alias for
//! `std::result::Result<T, EmulatorError>`.
//!
//! # Recoverable vs. fatal
//!
//! The model cache and display list are fixed-capacity resources. Running out
//! of model slots, display list nodes or vertex buffer space is expected during
//! normal operation and is reported through the *recoverable* variants
//! ([`EmulatorError::ModelCacheFull`], [`EmulatorError::DisplayListFull`],
//! [`EmulatorError::VertexBufferOverflow`]). The documented response is to clear
//! the affected cache and retry the caching pass.
//!
//! Everything else indicates a configuration problem, malformed input or a
//! backend that cannot provide resources.

use thiserror::Error;

use super::legacy3d::PolyState;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors raised by the model cache, display list compiler and configuration layer
#[derive(Error, Debug)]
pub enum EmulatorError {
    /// Every model slot in the cache is occupied
    #[error("model cache is full")]
    ModelCacheFull,

    /// Not enough display list nodes left for the requested append
    #[error("display list is full")]
    DisplayListFull,

    /// The GPU vertex buffer has no room for the next polygon
    #[error("vertex buffer overflow")]
    VertexBufferOverflow,

    /// The host-side staging buffer for one render state overflowed
    ///
    /// Staging buffers are sized to hold any single model, so this points at a
    /// misconfigured `staging_vertices` limit rather than at cache pressure.
    #[error("{state} staging buffer overflow: {needed} vertices needed, capacity is {capacity}")]
    StagingBufferOverflow {
        state: PolyState,
        needed: usize,
        capacity: usize,
    },

    /// The backend could not provide a vertex buffer of any acceptable size
    #[error("unable to allocate a {} vertex buffer ({bytes} bytes was the last attempt)", cache_kind(.dynamic))]
    BufferAllocation { dynamic: bool, bytes: usize },

    /// LUT index outside the table allocated for this cache
    #[error("LUT index 0x{index:X} out of range (table has 0x{size:X} entries)")]
    LutIndexOutOfRange { index: u32, size: usize },

    /// The polygon stream ended before the terminating header
    #[error("model data truncated at word {offset}: {needed} words needed, {available} available")]
    TruncatedModel {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// `begin_model` was called while another model was still being staged
    #[error("a model is already being staged")]
    StagingInProgress,

    /// The staging handle does not belong to the model currently being staged
    #[error("no model is being staged")]
    NoModelInProgress,

    /// The model id does not name a model in this cache
    ///
    /// Ids are invalidated by clearing the cache.
    #[error("unknown model id {id}")]
    UnknownModel { id: u32 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

fn cache_kind(dynamic: &bool) -> &'static str {
    if *dynamic {
        "dynamic"
    } else {
        "static"
    }
}

impl EmulatorError {
    /// Check whether the error is a cache-pressure signal
    ///
    /// Recoverable errors are resolved by clearing the model cache and caching
    /// again. They are not defects and should not be reported as such.
    ///
    /// # Examples
    ///
    /// ```
    /// use real3d::EmulatorError;
    ///
    /// assert!(EmulatorError::VertexBufferOverflow.is_recoverable());
    /// assert!(!EmulatorError::NoModelInProgress.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EmulatorError::ModelCacheFull
                | EmulatorError::DisplayListFull
                | EmulatorError::VertexBufferOverflow
        )
    }
}
