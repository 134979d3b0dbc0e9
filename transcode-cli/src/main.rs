//! Tile repack CLI - merge tiled HEVC encoder output into whole frames.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use transcode_core::{BsfContext, Packet, TimeBase, Timestamp};
use transcode_hevc::{HevcTileRepack, TileRepackConfig};

/// One tile input given on the command line as `INDEX:PATH`.
#[derive(Debug, Clone)]
struct TileInput {
    index: u8,
    path: PathBuf,
}

fn parse_tile_input(s: &str) -> Result<TileInput, String> {
    let (index, path) = s
        .split_once(':')
        .ok_or_else(|| format!("expected INDEX:PATH, got '{}'", s))?;
    let index = index
        .parse()
        .map_err(|_| format!("tile index '{}' is not a number in 0..=255", index))?;
    Ok(TileInput {
        index,
        path: PathBuf::from(path),
    })
}

/// Command-line arguments for the tile-repack tool.
#[derive(Parser, Debug)]
#[command(name = "tile-repack")]
#[command(version)]
#[command(about = "Merge per-tile HEVC packets into one Annex-B packet per frame")]
#[command(long_about = "Reads one Annex-B file per tile and repacks them into frames.\n\n\
    Tiles are fed to the filter in the order given; every completed frame is\n\
    appended to the output file.\n\n\
    EXAMPLES:\n    \
    tile-repack --tile-num 2 -o frame.hevc 0:tile0.hevc 1:tile1.hevc\n    \
    tile-repack --tile-num 4 -o out.hevc 3:t3.bin 1:t1.bin 0:t0.bin 2:t2.bin --json")]
struct Args {
    /// Number of tiles per frame (1-255)
    #[arg(short = 'n', long)]
    tile_num: u32,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Presentation timestamp stamped on every tile (90 kHz units)
    #[arg(long, default_value_t = 0)]
    pts: i64,

    /// Tile inputs as INDEX:PATH
    #[arg(required = true, value_parser = parse_tile_input)]
    tiles: Vec<TileInput>,

    /// Print a JSON summary instead of log output
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "json")]
    verbose: bool,
}

/// Summary of one run.
#[derive(Debug, Default, Serialize)]
struct RepackSummary {
    /// Tile packets read.
    tiles_read: usize,
    /// Frames written.
    frames_written: usize,
    /// Total input payload bytes.
    input_bytes: u64,
    /// Total output payload bytes.
    output_bytes: u64,
}

fn run(args: &Args) -> anyhow::Result<RepackSummary> {
    let filter = HevcTileRepack::new(TileRepackConfig::new(args.tile_num))
        .context("invalid tile configuration")?;
    let mut ctx = BsfContext::new(filter);

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    let pts = Timestamp::new(args.pts, TimeBase::MPEG);
    let mut summary = RepackSummary::default();
    let mut frames = Vec::new();

    for tile in &args.tiles {
        let payload = std::fs::read(&tile.path)
            .with_context(|| format!("failed to read {}", tile.path.display()))?;
        debug!(tile = tile.index, size = payload.len(), path = %tile.path.display(), "read tile");
        summary.tiles_read += 1;
        summary.input_bytes += payload.len() as u64;

        let packet = Packet::new(payload)
            .with_timestamps(pts, pts)
            .with_tile_index(tile.index);
        ctx.process_into(Some(packet), &mut frames)
            .with_context(|| format!("tile {} from {}", tile.index, tile.path.display()))?;

        for frame in frames.drain(..) {
            writer.write_all(frame.data())?;
            summary.frames_written += 1;
            summary.output_bytes += frame.size() as u64;
            info!(
                size = frame.size(),
                pts = %frame.pts,
                seconds = ?frame.pts.to_seconds(),
                "frame written"
            );
        }
    }

    let pending = ctx.filter().position();
    ctx.process_into(None, &mut frames)?;
    if pending > 0 {
        info!(tiles = pending, "incomplete frame discarded at end of input");
    }

    writer.flush()?;
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !args.json {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(if args.verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            })
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    let summary = run(&args)?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        info!(
            tiles = summary.tiles_read,
            frames = summary.frames_written,
            bytes = summary.output_bytes,
            "done"
        );
    }
    Ok(())
}
