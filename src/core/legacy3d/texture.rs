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

//! Texture manager boundary
//!
//! Texture decoding and atlas management live outside the model cache. While
//! decoding a model, every textured polygon asks the [`TextureManager`] to make
//! its texture available, either by recording a deferred reference (static
//! cache) or by decoding immediately (dynamic cache, or when the manager cannot
//! record more references).

/// A rectangle of texture memory in a given format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureRef {
    /// Texture format code (0-7)
    pub format: u8,
    /// Base X in the 2048×2048 texture memory
    pub x: u32,
    /// Base Y in the 2048×2048 texture memory
    pub y: u32,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
}

/// Location of a format's decoded texels in the host texture maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexSheet {
    /// Host texture map number
    pub map_num: u32,
    /// X offset of the sheet inside the map
    pub x_offset: u32,
    /// Y offset of the sheet inside the map
    pub y_offset: u32,
}

/// Texture services consumed by the model cache
pub trait TextureManager {
    /// Record a deferred reference to `tex`
    ///
    /// Returns `false` when the reference could not be recorded; the caller
    /// must then decode the texture immediately.
    fn add_ref(&mut self, tex: &TextureRef) -> bool;

    /// Decode `tex` into the host texture maps now
    fn decode_texture(&mut self, tex: &TextureRef);

    /// Where textures of `format` are placed in the host texture maps
    fn sheet(&self, format: u8) -> TexSheet;
}

/// Headless texture manager that only keeps track of requests
///
/// Accepts up to `max_refs` deferred references; beyond that, `add_ref` fails
/// and forces immediate decoding. All formats share sheet 0 at the origin.
#[derive(Debug, Clone, Default)]
pub struct TextureLog {
    /// Deferred references accepted so far
    pub refs: Vec<TextureRef>,
    /// Immediate decode requests, in call order
    pub decoded: Vec<TextureRef>,
    max_refs: usize,
}

impl TextureLog {
    /// Create a log accepting at most `max_refs` deferred references
    pub fn new(max_refs: usize) -> Self {
        Self {
            refs: Vec::new(),
            decoded: Vec::new(),
            max_refs,
        }
    }
}

impl TextureManager for TextureLog {
    fn add_ref(&mut self, tex: &TextureRef) -> bool {
        if self.refs.contains(tex) {
            return true;
        }
        if self.refs.len() >= self.max_refs {
            return false;
        }
        self.refs.push(*tex);
        true
    }

    fn decode_texture(&mut self, tex: &TextureRef) {
        self.decoded.push(*tex);
    }

    fn sheet(&self, _format: u8) -> TexSheet {
        TexSheet::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(x: u32) -> TextureRef {
        TextureRef {
            format: 2,
            x,
            y: 0,
            width: 64,
            height: 64,
        }
    }

    #[test]
    fn test_texture_log_limits_refs() {
        let mut log = TextureLog::new(2);
        assert!(log.add_ref(&tex(0)));
        assert!(log.add_ref(&tex(64)));
        assert!(!log.add_ref(&tex(128)));
        assert_eq!(log.refs.len(), 2);
    }

    #[test]
    fn test_texture_log_duplicate_ref_accepted() {
        let mut log = TextureLog::new(1);
        assert!(log.add_ref(&tex(0)));
        assert!(log.add_ref(&tex(0)));
        assert_eq!(log.refs.len(), 1);
    }

    #[test]
    fn test_texture_log_records_decodes() {
        let mut log = TextureLog::new(0);
        log.decode_texture(&tex(32));
        assert_eq!(log.decoded, vec![tex(32)]);
        assert_eq!(log.sheet(7), TexSheet::default());
    }
}
