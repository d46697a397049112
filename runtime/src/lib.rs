//! Command line runtime for the person sensor.

use clap::{Parser, Subcommand, ValueEnum};
use person_sensor::packet::{FaceRecord, GeometryLayout};
use person_sensor::Config;
use std::{path::PathBuf, time::Duration};

pub mod logging;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// I2C adapter the sensor is attached to
    #[arg(long, env = "PERSON_SENSOR_BUS", default_value = "/dev/i2c-1")]
    pub bus: PathBuf,
    /// 7-bit device address, decimal or 0x-prefixed hex
    #[arg(long, env = "PERSON_SENSOR_ADDRESS", default_value = "0x62", value_parser = parse_address)]
    pub address: u8,
    /// Delay between polls in milliseconds
    #[arg(long, env = "PERSON_SENSOR_INTERVAL_MS", default_value_t = 200)]
    pub interval_ms: u64,
    /// Wire layout of the face geometry bytes
    #[arg(long, env = "PERSON_SENSOR_LAYOUT", value_enum, default_value_t = Layout::WidthHeight)]
    pub layout: Layout,
    /// Only report faces; never ask the sensor to learn identities
    #[arg(long, env = "PERSON_SENSOR_NO_RECOGNITION")]
    pub no_recognition: bool,
    /// Disable the sensor's own result smoothing
    #[arg(long, env = "PERSON_SENSOR_NO_SMOOTHING")]
    pub no_smoothing: bool,
    /// Minimum box confidence (0-255) for a face to be calibrated
    #[arg(long, env = "PERSON_SENSOR_CONFIDENCE", default_value_t = 95)]
    pub confidence: u8,
    /// Identity capacity of the sensor
    #[arg(long, env = "PERSON_SENSOR_MAX_IDS", default_value_t = 7)]
    pub max_ids: u8,
    /// Replay frames from a JSON file instead of opening the bus
    #[arg(long, env = "PERSON_SENSOR_SCRIPT")]
    pub script: Option<PathBuf>,
    /// Print every sensation as a JSON line on stdout
    #[arg(long, env = "PERSON_SENSOR_JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll the sensor until interrupted (default)
    Run,
    /// List every device that answers on the bus
    Scan,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    WidthHeight,
    Corners,
}

impl From<Layout> for GeometryLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::WidthHeight => GeometryLayout::WidthHeight,
            Layout::Corners => GeometryLayout::Corners,
        }
    }
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    match parsed {
        Ok(addr) if addr < 0x80 => Ok(addr),
        Ok(addr) => Err(format!("{addr:#04x} is not a 7-bit address")),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    /// Build the sensor configuration from the parsed arguments.
    pub fn config(&self) -> Config {
        let mut config = Config {
            address: self.address,
            poll_interval: Duration::from_millis(self.interval_ms),
            layout: self.layout.into(),
            recognition: !self.no_recognition,
            ..Config::default()
        };
        config.device.enable_id = config.recognition;
        config.device.smoothing = !self.no_smoothing;
        config.policy.confidence_threshold = self.confidence;
        config.policy.max_ids = self.max_ids;
        config
    }
}

/// One line per face, e.g. `Face #0: 200 confidence, (10, 20), 30x40, facing`.
pub fn describe_face(index: usize, face: &FaceRecord) -> String {
    let b = &face.bounds;
    let mut line = format!(
        "Face #{index}: {} confidence, ({}, {}), {}x{}, {}",
        face.box_confidence,
        b.left,
        b.top,
        b.width,
        b.height,
        if face.is_facing { "facing" } else { "not facing" }
    );
    if face.is_recognized() {
        line.push_str(&format!(", person {} ({})", face.id, face.id_confidence));
    }
    line
}

/// Render scan results as an 8 x 16 grid, `@` where a device answered.
pub fn scan_grid(found: &[u8]) -> String {
    let mut out = String::new();
    for addr in 0..0x80u8 {
        if addr % 16 == 0 {
            out.push_str(&format!("{addr:02x} "));
        }
        out.push(if found.contains(&addr) { '@' } else { '.' });
        out.push_str(if addr % 16 == 15 { "\n" } else { "  " });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use person_sensor::packet::{BoundingBox, I2C_ADDRESS};

    #[test]
    fn defaults_match_sensor_defaults() {
        let cli = Cli::try_parse_from(["person-sensor"]).unwrap();
        assert_eq!(cli.address, I2C_ADDRESS);
        assert_eq!(cli.config(), Config::default());
        assert_eq!(cli.command, None);
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "person-sensor",
            "--address",
            "98",
            "--interval-ms",
            "50",
            "--layout",
            "corners",
            "--no-recognition",
            "--confidence",
            "120",
            "--max-ids",
            "4",
            "scan",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.address, 0x62);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.layout, GeometryLayout::Corners);
        assert!(!config.recognition);
        assert!(!config.device.enable_id);
        assert_eq!(config.policy.confidence_threshold, 120);
        assert_eq!(config.policy.max_ids, 4);
        assert_eq!(cli.command, Some(Command::Scan));
    }

    #[test]
    fn every_flag_reads_the_environment() {
        let cmd = Cli::command();
        for arg in cmd.get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "version") {
                continue;
            }
            let env = arg
                .get_env()
                .unwrap_or_else(|| panic!("--{} has no env var", arg.get_id()));
            assert!(env.to_string_lossy().starts_with("PERSON_SENSOR_"));
        }
    }

    #[test]
    fn rejects_eight_bit_addresses() {
        assert!(parse_address("0x80").is_err());
        assert!(parse_address("nope").is_err());
        assert_eq!(parse_address("0x1f"), Ok(0x1f));
    }

    #[test]
    fn face_lines() {
        let face = FaceRecord {
            box_confidence: 200,
            bounds: BoundingBox {
                left: 10,
                top: 20,
                width: 30,
                height: 40,
            },
            id_confidence: 0,
            id: 0,
            is_facing: true,
        };
        assert_eq!(
            describe_face(0, &face),
            "Face #0: 200 confidence, (10, 20), 30x40, facing"
        );
        let known = FaceRecord {
            id_confidence: 90,
            id: 2,
            is_facing: false,
            ..face
        };
        assert_eq!(
            describe_face(1, &known),
            "Face #1: 200 confidence, (10, 20), 30x40, not facing, person 2 (90)"
        );
    }

    #[test]
    fn grid_marks_found_devices() {
        let grid = scan_grid(&[0x62]);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[6].starts_with("60 "));
        assert_eq!(lines[6].matches('@').count(), 1);
        assert_eq!(grid.matches('@').count(), 1);
    }
}
