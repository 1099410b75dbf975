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

//! real3d-dump
//!
//! Decodes a raw Real3D model (a stream of 32-bit polygon words), caches it
//! into a headless recording backend, renders one frame and prints what the
//! backend was asked to draw.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use real3d::core::config::Legacy3DConfig;
use real3d::core::legacy3d::{
    FrameStats, Legacy3D, ModelRequest, ModelSource, PolyState, RecordingBackend, TextureLog,
    Transform, ViewportState,
};

/// Texture references a static model may defer before decoding immediately
const MAX_TEXTURE_REFS: usize = 256;

#[derive(Parser)]
#[command(name = "real3d-dump")]
#[command(about = "Decode a Real3D model and report the resulting draw calls")]
#[command(version)]
struct Cli {
    /// Raw model file (32-bit polygon words)
    model_file: PathBuf,

    /// Cache the model as a polygon RAM model
    #[arg(long)]
    dynamic: bool,

    /// Words in the file are big-endian
    #[arg(long)]
    big_endian: bool,

    /// LUT index to cache the model under
    #[arg(long, default_value_t = 0)]
    lut: u32,

    /// Texture offset word
    #[arg(long, default_value_t = 0)]
    tex_offset: u16,

    /// Renderer config file (TOML); defaults to $REAL3D_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct StateReport {
    first_vertex: u32,
    vertices: u32,
}

#[derive(Serialize)]
struct Report {
    source: ModelSource,
    words: usize,
    opaque: StateReport,
    alpha: StateReport,
    vbo_capacity: usize,
    draws: Vec<(u32, u32)>,
    textures_decoded: usize,
    textures_deferred: usize,
    stats: FrameStats,
}

fn read_words(bytes: &[u8], big_endian: bool) -> Vec<u32> {
    let chunks = bytes.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        log::warn!(
            "Ignoring {} trailing bytes after the last whole word",
            chunks.remainder().len()
        );
    }
    chunks
        .map(|c| {
            let word = [c[0], c[1], c[2], c[3]];
            if big_endian {
                u32::from_be_bytes(word)
            } else {
                u32::from_le_bytes(word)
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let config = match cli
        .config
        .clone()
        .or_else(|| std::env::var_os("REAL3D_CONFIG").map(PathBuf::from))
    {
        Some(path) => Legacy3DConfig::load(&path)?,
        None => Legacy3DConfig::default(),
    };

    let bytes = std::fs::read(&cli.model_file)?;
    let words = read_words(&bytes, cli.big_endian);
    log::info!(
        "Loaded {} words from {}",
        words.len(),
        cli.model_file.display()
    );

    let source = if cli.dynamic {
        ModelSource::Dynamic
    } else {
        ModelSource::Static
    };

    let mut backend = RecordingBackend::new();
    let mut textures = TextureLog::new(MAX_TEXTURE_REFS);
    let mut renderer = Legacy3D::new(&mut backend, config)?;

    renderer.begin_frame();
    renderer.set_viewport(&ViewportState::default())?;
    let id = renderer.draw_model(
        &mut backend,
        &mut textures,
        &ModelRequest {
            source,
            lut_idx: cli.lut,
            tex_offset: cli.tex_offset,
            tex_offset_xy: [0, 0],
            words: &words,
            polygon_ram: &[],
        },
        &Transform::default(),
    )?;

    backend.clear_calls();
    renderer.render_frame(&mut backend);

    let cache = renderer.cache(source);
    let model = cache.model(id).ok_or("cached model missing after render")?;
    let state_report = |state: PolyState| {
        let range = model.range(state);
        StateReport {
            first_vertex: range.first,
            vertices: range.count,
        }
    };

    let report = Report {
        source,
        words: words.len(),
        opaque: state_report(PolyState::Opaque),
        alpha: state_report(PolyState::Alpha),
        vbo_capacity: cache.vbo_capacity(),
        draws: backend.draws(),
        textures_decoded: textures.decoded.len(),
        textures_deferred: model.texture_refs.len(),
        stats: *renderer.stats(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Model:       {} ({} words)", cli.model_file.display(), report.words);
        println!("Cache:       {:?}, {} vertices", report.source, report.vbo_capacity);
        println!(
            "Opaque:      {} vertices at {}",
            report.opaque.vertices, report.opaque.first_vertex
        );
        println!(
            "Alpha:       {} vertices at {}",
            report.alpha.vertices, report.alpha.first_vertex
        );
        println!("Polygons:    {}", report.stats.polygons_inserted);
        println!(
            "Textures:    {} decoded, {} deferred",
            report.textures_decoded, report.textures_deferred
        );
        for (first, count) in &report.draws {
            println!("Draw:        {} vertices from {}", count, first);
        }
    }

    renderer.destroy(&mut backend);
    Ok(())
}
