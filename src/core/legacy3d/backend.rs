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

//! Graphics backend boundary
//!
//! The model cache and display list renderer only need a narrow slice of a
//! graphics API: one vertex buffer per cache, partial uploads, ranged draws
//! and a handful of fixed-function states and uniforms. [`GpuBackend`]
//! captures that contract so the core does not depend on any particular API.
//!
//! [`RecordingBackend`] is a headless implementation that keeps buffer
//! contents in host memory and logs every call. It is used by the dump tool,
//! the benchmarks and the tests.

use thiserror::Error;

use super::context::ViewportState;
use super::geometry::Mat4;

/// Opaque handle to a backend vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Expected update frequency of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written rarely, drawn many times (static model cache)
    Static,
    /// Rewritten every frame (dynamic model cache)
    Stream,
}

/// Which winding faces the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

/// Backface culling configuration for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullState {
    /// No culling
    Disabled,
    /// Cull back faces, with the given front face
    Enabled(FrontFace),
}

/// The backend could not allocate a buffer of the requested size
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("out of memory allocating {bytes} bytes")]
pub struct OutOfMemory {
    pub bytes: usize,
}

/// Graphics API operations used by the model cache and renderer
pub trait GpuBackend {
    /// Allocate an uninitialized vertex buffer of `bytes` bytes
    fn allocate_buffer(
        &mut self,
        bytes: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, OutOfMemory>;

    /// Release a buffer returned by `allocate_buffer`
    fn release_buffer(&mut self, handle: BufferHandle);

    /// Copy `data` into the buffer starting at `byte_offset`
    fn upload_sub_data(&mut self, handle: BufferHandle, byte_offset: usize, data: &[u8]);

    /// Make `handle` the source for subsequent draws
    fn bind_vertex_buffer(&mut self, handle: BufferHandle);

    /// Enable or disable alpha blending
    fn set_blend(&mut self, enabled: bool);

    /// Configure backface culling
    fn set_cull_state(&mut self, state: CullState);

    /// Set the viewport rectangle
    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Upload lighting, fog, spotlight and projection uniforms
    fn set_scene_uniforms(&mut self, viewport: &ViewportState);

    /// Upload the model-view matrix
    fn set_model_view(&mut self, model_view: &Mat4);

    /// Draw `count` vertices as triangles starting at `first_vertex` of the bound buffer
    fn draw_range(&mut self, first_vertex: u32, count: u32);
}

/// A call made on a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Allocate { bytes: usize, usage: BufferUsage },
    Release(BufferHandle),
    Upload {
        handle: BufferHandle,
        byte_offset: usize,
        len: usize,
    },
    Bind(BufferHandle),
    Blend(bool),
    Cull(CullState),
    Viewport {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    SceneUniforms,
    ModelView(Mat4),
    Draw { first_vertex: u32, count: u32 },
}

/// Headless backend that stores buffers in host memory and records calls
#[derive(Debug, Default)]
pub struct RecordingBackend {
    buffers: Vec<Option<Vec<u8>>>,
    calls: Vec<BackendCall>,
    max_allocation: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that fails every allocation larger than `bytes`
    pub fn with_allocation_limit(bytes: usize) -> Self {
        Self {
            max_allocation: Some(bytes),
            ..Self::default()
        }
    }

    /// All calls recorded so far
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls (buffer contents are kept)
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// `(first_vertex, count)` of every draw, in order
    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Draw {
                    first_vertex,
                    count,
                } => Some((*first_vertex, *count)),
                _ => None,
            })
            .collect()
    }

    /// Contents of a live buffer
    pub fn buffer(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers
            .get(handle.0 as usize)
            .and_then(|b| b.as_deref())
    }

    /// Number of buffers allocated and not yet released
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }
}

impl GpuBackend for RecordingBackend {
    fn allocate_buffer(
        &mut self,
        bytes: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, OutOfMemory> {
        self.calls.push(BackendCall::Allocate { bytes, usage });
        if self.max_allocation.is_some_and(|max| bytes > max) {
            return Err(OutOfMemory { bytes });
        }
        self.buffers.push(Some(vec![0; bytes]));
        Ok(BufferHandle((self.buffers.len() - 1) as u32))
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        self.calls.push(BackendCall::Release(handle));
        if let Some(slot) = self.buffers.get_mut(handle.0 as usize) {
            *slot = None;
        }
    }

    fn upload_sub_data(&mut self, handle: BufferHandle, byte_offset: usize, data: &[u8]) {
        self.calls.push(BackendCall::Upload {
            handle,
            byte_offset,
            len: data.len(),
        });
        let Some(Some(buffer)) = self.buffers.get_mut(handle.0 as usize) else {
            log::warn!("Upload to unknown buffer {:?}", handle);
            return;
        };
        match buffer.get_mut(byte_offset..byte_offset + data.len()) {
            Some(dst) => dst.copy_from_slice(data),
            None => log::warn!(
                "Upload of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                byte_offset,
                buffer.len()
            ),
        }
    }

    fn bind_vertex_buffer(&mut self, handle: BufferHandle) {
        self.calls.push(BackendCall::Bind(handle));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.calls.push(BackendCall::Blend(enabled));
    }

    fn set_cull_state(&mut self, state: CullState) {
        self.calls.push(BackendCall::Cull(state));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(BackendCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn set_scene_uniforms(&mut self, _viewport: &ViewportState) {
        self.calls.push(BackendCall::SceneUniforms);
    }

    fn set_model_view(&mut self, model_view: &Mat4) {
        self.calls.push(BackendCall::ModelView(*model_view));
    }

    fn draw_range(&mut self, first_vertex: u32, count: u32) {
        self.calls.push(BackendCall::Draw {
            first_vertex,
            count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_upload() {
        let mut backend = RecordingBackend::new();
        let handle = backend.allocate_buffer(8, BufferUsage::Static).unwrap();
        backend.upload_sub_data(handle, 4, &[1, 2, 3, 4]);
        assert_eq!(backend.buffer(handle), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
    }

    #[test]
    fn test_allocation_limit() {
        let mut backend = RecordingBackend::with_allocation_limit(100);
        assert_eq!(
            backend.allocate_buffer(101, BufferUsage::Stream),
            Err(OutOfMemory { bytes: 101 })
        );
        assert!(backend.allocate_buffer(100, BufferUsage::Stream).is_ok());
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn test_out_of_range_upload_ignored() {
        let mut backend = RecordingBackend::new();
        let handle = backend.allocate_buffer(4, BufferUsage::Static).unwrap();
        backend.upload_sub_data(handle, 2, &[9, 9, 9, 9]);
        assert_eq!(backend.buffer(handle), Some(&[0, 0, 0, 0][..]));
    }

    #[test]
    fn test_release() {
        let mut backend = RecordingBackend::new();
        let handle = backend.allocate_buffer(4, BufferUsage::Static).unwrap();
        backend.release_buffer(handle);
        assert_eq!(backend.buffer(handle), None);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_draws_filter() {
        let mut backend = RecordingBackend::new();
        backend.set_blend(true);
        backend.draw_range(0, 3);
        backend.set_cull_state(CullState::Disabled);
        backend.draw_range(3, 6);
        assert_eq!(backend.draws(), vec![(0, 3), (3, 6)]);
        backend.clear_calls();
        assert!(backend.calls().is_empty());
    }
}
