//! Match Sim - synthetic detections generator
//!
//! Writes a deterministic detections JSONL file (and optionally the matching
//! frame images) so the analytics pipeline can be exercised without a
//! detector: players drift around two halves of the pitch, the ball stays at
//! its holder's feet and now and then jumps to another player.
//!
//! Usage:
//!   match-sim --output sim/detections.jsonl --frames 500 --images
//!   match-analytics --detections sim/detections.jsonl

use anyhow::Context;
use chrono::{Duration, SecondsFormat, TimeZone, Utc};
use clap::Parser;
use image::{Rgb, RgbImage};
use match_analytics::io::detections::{DetectionClass, DetectionRecord, RawDetection};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

const PITCH: Rgb<u8> = Rgb([30, 140, 40]);
const LIGHT_KIT: Rgb<u8> = Rgb([245, 245, 245]);
const RED_KIT: Rgb<u8> = Rgb([210, 15, 25]);
const BALL: Rgb<u8> = Rgb([250, 220, 60]);

/// Player box size (w, h) and kit patch half size in pixels
const PLAYER_BOX: (i32, i32) = (30, 60);
const KIT_HALF: i32 = 14;
const BALL_HALF: i32 = 4;

/// Frame interval for generated timestamps (25 fps)
const FRAME_INTERVAL_MS: i64 = 40;

#[derive(Parser, Debug)]
#[command(name = "match-sim", version, about = "Synthetic detections generator")]
struct Args {
    /// Detections JSONL output path
    #[arg(short, long, default_value = "sim/detections.jsonl")]
    output: PathBuf,

    /// Number of frames to generate
    #[arg(short, long, default_value = "300")]
    frames: u64,

    /// Players per side
    #[arg(short, long, default_value = "5")]
    players: usize,

    /// RNG seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Frame width in pixels
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "720")]
    height: u32,

    /// Chance per frame that the ball changes holder
    #[arg(long, default_value = "0.04")]
    pass_chance: f64,

    /// Chance per frame that a player detection is missed
    #[arg(long, default_value = "0.03")]
    dropout: f64,

    /// Also render PNG frames next to the detections file
    #[arg(long)]
    images: bool,
}

#[derive(Debug, Clone, Copy)]
struct SimPlayer {
    x: i32,
    y: i32,
    light_kit: bool,
}

struct Simulation {
    rng: ChaCha8Rng,
    width: i32,
    height: i32,
    players: Vec<SimPlayer>,
    holder: usize,
    pass_chance: f64,
    dropout: f64,
    passes: u64,
}

impl Simulation {
    fn new(args: &Args) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
        let width = args.width as i32;
        let height = args.height as i32;
        let margin = PLAYER_BOX.1;

        let mut players = Vec::with_capacity(args.players * 2);
        for side in 0..2 {
            let (lo, hi) = if side == 0 { (margin, width / 2) } else { (width / 2, width - margin) };
            for _ in 0..args.players {
                players.push(SimPlayer {
                    x: rng.gen_range(lo..hi.max(lo + 1)),
                    y: rng.gen_range(margin..(height - margin).max(margin + 1)),
                    light_kit: side == 0,
                });
            }
        }

        Self {
            rng,
            width,
            height,
            players,
            holder: 0,
            pass_chance: args.pass_chance.clamp(0.0, 1.0),
            dropout: args.dropout.clamp(0.0, 1.0),
            passes: 0,
        }
    }

    /// Advance one frame and return the raw detections
    fn step(&mut self) -> Vec<RawDetection> {
        let (w, h) = PLAYER_BOX;
        for p in &mut self.players {
            p.x = (p.x + self.rng.gen_range(-3..=3)).min(self.width - w).max(w);
            p.y = (p.y + self.rng.gen_range(-2..=2)).min(self.height - h).max(h);
        }

        if self.players.len() > 1 && self.rng.gen_bool(self.pass_chance) {
            let next = self.rng.gen_range(0..self.players.len() - 1);
            self.holder = if next >= self.holder { next + 1 } else { next };
            self.passes += 1;
        }

        let mut detections = Vec::with_capacity(self.players.len() + 2);
        for p in &self.players {
            if self.rng.gen_bool(self.dropout) {
                continue;
            }
            detections.push(RawDetection {
                class: DetectionClass::Person,
                bbox: box_around(p.x, p.y, w / 2, h / 2),
                confidence: self.rng.gen_range(0.55..0.99),
            });
        }

        // Low confidence clutter the reader must filter out
        if self.rng.gen_bool(0.1) {
            let (x, y) = (self.rng.gen_range(0..self.width), self.rng.gen_range(0..self.height));
            detections.push(RawDetection {
                class: DetectionClass::Person,
                bbox: box_around(x, y, w / 2, h / 2),
                confidence: self.rng.gen_range(0.1..0.45),
            });
        }

        if let Some(holder) = self.players.get(self.holder) {
            let (bx, by) = (holder.x + 6, holder.y + h / 2 - BALL_HALF);
            detections.push(RawDetection {
                class: DetectionClass::Ball,
                bbox: box_around(bx, by, BALL_HALF, BALL_HALF),
                confidence: self.rng.gen_range(0.35..0.95),
            });
        }

        detections
    }

    /// Paint the current state: kit patches centred on each player box
    fn render(&self, detections: &[RawDetection]) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width as u32, self.height as u32, PITCH);
        for p in &self.players {
            let kit = if p.light_kit { LIGHT_KIT } else { RED_KIT };
            fill(&mut img, p.x, p.y, KIT_HALF, kit);
        }
        let balls = detections.iter().filter(|d| d.class == DetectionClass::Ball);
        for bbox in balls.filter_map(RawDetection::bounding_box) {
            let b = bbox.centroid();
            fill(&mut img, b.x, b.y, BALL_HALF, BALL);
        }
        img
    }
}

fn box_around(x: i32, y: i32, half_w: i32, half_h: i32) -> [f64; 4] {
    [
        f64::from(x - half_w),
        f64::from(y - half_h),
        f64::from(x + half_w),
        f64::from(y + half_h),
    ]
}

fn fill(img: &mut RgbImage, cx: i32, cy: i32, half: i32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    for y in (cy - half).max(0)..(cy + half).min(h) {
        for x in (cx - half).max(0)..(cx + half).min(w) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    info!(
        output = %args.output.display(),
        frames = %args.frames,
        players_per_side = %args.players,
        seed = %args.seed,
        images = %args.images,
        "match_sim_starting"
    );

    let out_dir = args.output.parent().map(Path::to_path_buf).unwrap_or_default();
    if !out_dir.as_os_str().is_empty() {
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    }
    if args.images {
        fs::create_dir_all(out_dir.join("frames"))
            .with_context(|| format!("Failed to create frames directory in {}", out_dir.display()))?;
    }

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    let mut sim = Simulation::new(&args);
    let start = Utc
        .timestamp_opt(1_767_225_600, 0)
        .single()
        .context("Invalid simulation start time")?;

    for frame in 1..=args.frames {
        let detections = sim.step();

        let image = if args.images {
            let rel = PathBuf::from("frames").join(format!("{:05}.png", frame));
            let path = out_dir.join(&rel);
            sim.render(&detections)
                .save(&path)
                .with_context(|| format!("Failed to write frame {}", path.display()))?;
            Some(rel)
        } else {
            None
        };

        let ts = start + Duration::milliseconds(frame as i64 * FRAME_INTERVAL_MS);
        let record = DetectionRecord {
            frame: Some(frame),
            image,
            ts: Some(ts.to_rfc3339_opts(SecondsFormat::Millis, false)),
            detections,
        };
        writeln!(writer, "{}", serde_json::to_string(&record)?)?;
    }
    writer.flush()?;

    info!(
        output = %args.output.display(),
        frames = %args.frames,
        holder_changes = %sim.passes,
        "match_sim_complete"
    );
    Ok(())
}
