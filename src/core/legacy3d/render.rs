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

//! Display list replay
//!
//! A cache draws one state's list at a time from its own vertex buffer. The
//! frame driver calls [`ModelCache::draw`] four times per frame: static
//! opaque, dynamic opaque, static alpha, dynamic alpha.

use super::backend::{CullState, FrontFace, GpuBackend};
use super::cache::ModelCache;
use super::display_list::NodeKind;
use super::geometry::Winding;
use super::polygon::PolyState;

impl Winding {
    /// Cull configuration that keeps the front faces of this winding
    pub fn cull_state(self) -> CullState {
        match self {
            Winding::Clockwise => CullState::Enabled(FrontFace::Clockwise),
            Winding::CounterClockwise => CullState::Enabled(FrontFace::CounterClockwise),
            Winding::NoCull => CullState::Disabled,
        }
    }
}

impl ModelCache {
    /// Replay the display list of one render state
    ///
    /// Viewport nodes only touch the backend when the next node draws
    /// something, so runs of viewports with no models in between cost
    /// nothing. Cull state changes are issued only when the winding differs
    /// from the previous model's.
    pub fn draw(&self, backend: &mut dyn GpuBackend, state: PolyState) {
        let mut nodes = self.display_list.iter(state).peekable();
        if nodes.peek().is_none() {
            return;
        }

        backend.bind_vertex_buffer(self.vbo);
        backend.set_blend(state == PolyState::Alpha);

        let mut cull = None;
        while let Some(node) = nodes.next() {
            match &node.kind {
                NodeKind::Viewport(viewport) => {
                    let followed_by_model = nodes
                        .peek()
                        .is_some_and(|next| matches!(next.kind, NodeKind::Model(_)));
                    if followed_by_model {
                        backend.set_viewport(viewport.x, viewport.y, viewport.width, viewport.height);
                        backend.set_scene_uniforms(viewport);
                    }
                }
                NodeKind::Model(model) => {
                    let wanted = model.winding.cull_state();
                    if cull != Some(wanted) {
                        backend.set_cull_state(wanted);
                        cull = Some(wanted);
                    }
                    backend.set_model_view(&model.model_view);
                    backend.draw_range(model.range.first, model.range.count);
                }
            }
        }
    }
}
