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

//! Per-frame display lists
//!
//! Every model instance and viewport change encountered while walking the
//! scene database is recorded with a snapshot of the state it needs. Nodes for
//! both rendering passes share one preallocated array; each pass threads its
//! own singly linked list through it by index. Append order is draw order,
//! which the alpha pass depends on.
//!
//! The list never grows beyond the capacity chosen at creation. Running out is
//! reported as [`EmulatorError::DisplayListFull`] and leaves the list as it
//! was before the failing call.

use super::context::{Transform, ViewportState};
use super::geometry::{resolve_winding, Mat4, Winding};
use super::polygon::PolyState;
use crate::core::error::{EmulatorError, Result};

/// A contiguous range of vertices in the cache's vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexRange {
    /// Index of the first vertex
    pub first: u32,
    /// Number of vertices
    pub count: u32,
}

/// A model instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelNode {
    /// Vertices to draw
    pub range: VertexRange,
    /// Model-view matrix at the time the instance was appended
    pub model_view: Mat4,
    /// Front face resolved for `model_view`
    pub winding: Winding,
}

/// Display list node payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Viewport(ViewportState),
    Model(ModelNode),
}

/// A node in one of the two display lists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayNode {
    pub kind: NodeKind,
    /// Index of the next node in the same list
    pub next: Option<u32>,
}

impl DisplayNode {
    pub fn is_viewport(&self) -> bool {
        matches!(self.kind, NodeKind::Viewport(_))
    }
}

/// Opaque and alpha display lists sharing one node array
#[derive(Debug)]
pub struct DisplayList {
    nodes: Vec<DisplayNode>,
    capacity: usize,
    head: [Option<u32>; 2],
    tail: [Option<u32>; 2],
}

impl DisplayList {
    /// Nodes reserved by a single append (one per state)
    const NODES_PER_APPEND: usize = 2;

    /// Create an empty display list holding at most `capacity` nodes
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
            head: [None; 2],
            tail: [None; 2],
        }
    }

    /// Number of nodes used across both lists
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Maximum number of nodes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empty both lists
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = [None; 2];
        self.tail = [None; 2];
    }

    /// Node at `index` of the shared array
    pub fn node(&self, index: u32) -> Option<&DisplayNode> {
        self.nodes.get(index as usize)
    }

    /// Iterate over the nodes of one state's list in draw order
    pub fn iter(&self, state: PolyState) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head[state.index()],
        }
    }

    /// Whether one more model or viewport append fits
    pub fn has_room(&self) -> bool {
        // A model may have both states and viewports always use both
        self.nodes.len() + Self::NODES_PER_APPEND <= self.capacity
    }

    fn ensure_room(&self) -> Result<()> {
        if !self.has_room() {
            return Err(EmulatorError::DisplayListFull);
        }
        Ok(())
    }

    fn push(&mut self, state: PolyState, kind: NodeKind) {
        let index = self.nodes.len() as u32;
        self.nodes.push(DisplayNode { kind, next: None });

        let s = state.index();
        match self.tail[s] {
            Some(tail) => self.nodes[tail as usize].next = Some(index),
            None => self.head[s] = Some(index),
        }
        self.tail[s] = Some(index);
    }

    /// Append a model instance to the list of every state it has vertices for
    ///
    /// The front face is resolved from `transform` once here so replay does
    /// not repeat the work.
    ///
    /// # Arguments
    ///
    /// * `ranges` - Vertex ranges of the cached model, indexed by [`PolyState::index`]
    /// * `transform` - Model-view matrix and Z sign of this instance
    ///
    /// # Returns
    ///
    /// - `Ok(())` once the instance is linked into its lists
    /// - `Err(EmulatorError::DisplayListFull)` if fewer than two nodes are
    ///   free; the lists are left unchanged
    pub fn append_model(&mut self, ranges: &[VertexRange; 2], transform: &Transform) -> Result<()> {
        self.ensure_room()?;

        let winding = resolve_winding(&transform.model_view, transform.z_sign);
        for state in PolyState::ALL {
            let range = ranges[state.index()];
            if range.count == 0 {
                continue;
            }
            self.push(
                state,
                NodeKind::Model(ModelNode {
                    range,
                    model_view: transform.model_view,
                    winding,
                }),
            );
        }
        Ok(())
    }

    /// Append a viewport snapshot to both lists
    pub fn append_viewport(&mut self, viewport: &ViewportState) -> Result<()> {
        self.ensure_room()?;

        for state in PolyState::ALL {
            self.push(state, NodeKind::Viewport(*viewport));
        }
        Ok(())
    }
}

/// Iterator over one state's display list
pub struct Iter<'a> {
    list: &'a DisplayList,
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a DisplayNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(node)
    }
}
