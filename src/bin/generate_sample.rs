//! Writes `data/parks.csv` and `data/fires_data.json` (NDJSON) with a
//! deterministic set of parks and wildfires for offline use:
//!
//! ```text
//! cargo run --bin generate_sample [output-dir]
//! HABITAT_LENS_LOCATIONS=data/parks.csv cargo run
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// (code, name, state, lat, lon)
const PARKS: &[(&str, &str, &str, f64, f64)] = &[
    ("ACAD", "Acadia National Park", "ME", 44.35, -68.21),
    ("ARCH", "Arches National Park", "UT", 38.68, -109.57),
    ("BIBE", "Big Bend National Park", "TX", 29.25, -103.25),
    ("EVER", "Everglades National Park", "FL", 25.32, -80.93),
    ("GLAC", "Glacier National Park", "MT", 48.80, -114.00),
    ("GRCA", "Grand Canyon National Park", "AZ", 36.06, -112.14),
    ("GRSM", "Great Smoky Mountains National Park", "TN, NC", 35.68, -83.53),
    ("OLYM", "Olympic National Park", "WA", 47.97, -123.50),
    ("YELL", "Yellowstone National Park", "WY, MT, ID", 44.60, -110.50),
    ("YOSE", "Yosemite National Park", "CA", 37.83, -119.50),
];

// Fire-prone regions: (state, centre lat, centre lon, spread in degrees)
const FIRE_REGIONS: &[(&str, f64, f64, f64)] = &[
    ("CA", 37.5, -120.0, 2.5),
    ("AZ", 34.0, -111.5, 1.8),
    ("FL", 27.5, -81.5, 1.2),
    ("MT", 47.0, -111.0, 2.0),
    ("UT", 39.0, -111.5, 1.5),
    ("WA", 47.5, -120.5, 1.5),
    ("TX", 31.0, -100.0, 2.5),
];

const FIRE_NAMES: &[&str] = &[
    "CEDAR", "LIGHTNING", "RIDGE", "CANYON", "PINE", "HOLLOW", "BUTTE", "CREEK", "MESA",
];

#[derive(Serialize)]
struct FireRow<'a> {
    name: String,
    year: i32,
    month: u32,
    lat: f64,
    lon: f64,
    state: &'a str,
}

fn write_parks(path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).context("creating parks.csv")?;
    writer.write_record(["Park Code", "Park Name", "State", "Latitude", "Longitude"])?;
    for (code, name, state, lat, lon) in PARKS {
        writer.write_record([
            code.to_string(),
            name.to_string(),
            state.to_string(),
            format!("{lat:.2}"),
            format!("{lon:.2}"),
        ])?;
    }
    writer.flush()?;
    Ok(PARKS.len())
}

fn write_fires(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut out = BufWriter::new(File::create(path).context("creating fires_data.json")?);
    let mut count = 0;

    for year in 1992..=2015 {
        for &(state, lat, lon, spread) in FIRE_REGIONS {
            // Mostly summer fires, a handful in other months.
            let n = 2 + rng.below(6);
            for _ in 0..n {
                let month = if rng.next_f64() < 0.8 {
                    6 + rng.below(4) as u32
                } else {
                    1 + rng.below(12) as u32
                };
                let row = FireRow {
                    name: FIRE_NAMES[rng.below(FIRE_NAMES.len() as u64) as usize].to_string(),
                    year,
                    month,
                    lat: rng.gauss(lat, spread / 2.0),
                    lon: rng.gauss(lon, spread / 2.0),
                    state,
                };
                serde_json::to_writer(&mut out, &row)?;
                out.write_all(b"\n")?;
                count += 1;
            }
        }
    }
    out.flush()?;
    Ok(count)
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let parks_path = out_dir.join("parks.csv");
    let parks = write_parks(&parks_path)?;

    let fires_path = out_dir.join("fires_data.json");
    let fires = write_fires(&fires_path, &mut rng)?;

    println!(
        "Wrote {parks} parks to {} and {fires} wildfires to {}",
        parks_path.display(),
        fires_path.display()
    );
    Ok(())
}
