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

//! Decode and cache throughput

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use real3d::core::config::CacheLimits;
use real3d::core::legacy3d::{
    DecodeContext, ModelCache, PolygonDecoder, RecordingBackend, TextureLog,
};

/// A strip of quads, each sharing two vertices with the previous one
fn quad_strip(quads: usize) -> Vec<u32> {
    let vertex = |x: i32, y: i32| [(x << 8) as u32, (y << 8) as u32, 0, 0];
    // Facing -Z: 0xFFC00000 is -1.0 in 1.22 fixed point
    let header = |reuse: u32| [0x40 | reuse, 0, 0, 0xFFC0_0000, 0, 0, 0x0080_0000];

    let mut words = Vec::new();
    words.extend(header(0));
    for v in [vertex(0, 0), vertex(0, 256), vertex(256, 256), vertex(256, 0)] {
        words.extend(v);
    }
    for i in 1..quads as i32 {
        // Reuse the previous quad's right edge
        words.extend(header(0b1100));
        words.extend(vertex(256 * (i + 1), 256));
        words.extend(vertex(256 * (i + 1), 0));
    }
    words.extend([0u32; 7]);
    words
}

fn bench_decode(c: &mut Criterion) {
    let words = quad_strip(1000);
    c.bench_function("decode_1000_quads", |b| {
        b.iter(|| {
            let count = PolygonDecoder::new(black_box(&words), 1.0 / 128.0)
                .filter(|p| p.is_ok())
                .count();
            black_box(count)
        })
    });
}

fn bench_cache(c: &mut Criterion) {
    let words = quad_strip(1000);
    let limits = CacheLimits {
        vbo_vertices: 16_384,
        staging_vertices: 8_192,
        max_models: 16,
        lut_entries: 16,
        display_list_entries: 16,
    };
    let mut backend = RecordingBackend::new();
    let mut textures = TextureLog::new(0);
    let mut cache = match ModelCache::create(&mut backend, &limits, true) {
        Ok(cache) => cache,
        Err(e) => panic!("cache creation failed: {}", e),
    };
    let ctx = DecodeContext::default();

    c.bench_function("cache_1000_quads", |b| {
        b.iter(|| {
            cache.clear();
            backend.clear_calls();
            let id = cache.cache_model(&mut backend, &mut textures, &ctx, 0, 0, black_box(&words));
            black_box(id.is_ok())
        })
    });
}

criterion_group!(benches, bench_decode, bench_cache);
criterion_main!(benches);
