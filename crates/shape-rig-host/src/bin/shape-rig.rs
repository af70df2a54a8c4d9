use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linux_embedded_hal::Delay;
use shape_rig_host::depth::ReplaySource;
use shape_rig_host::motors::Direction;
use shape_rig_host::platform::{self, BUS_PATH};
use shape_rig_host::scenarios::{self, RangeSummary};
use shape_rig_host::RigConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Bring-up harness for the PCA9685 motor bank and VL53L0X sensor"
)]
struct Cli {
    /// JSON rig configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// PCA9685 address, overrides the configuration
    #[arg(long, global = true, value_parser = parse_address)]
    pca_address: Option<u8>,

    /// VL53L0X address, overrides the configuration
    #[arg(long, global = true, value_parser = parse_address)]
    tof_address: Option<u8>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hold one PWM channel at a duty cycle
    Pwm {
        #[arg(long)]
        channel: u8,
        /// 0..=4095
        #[arg(long)]
        duty: u16,
        /// PWM frequency in Hz, 24..=1526
        #[arg(long)]
        frequency: Option<u16>,
        #[arg(long, default_value_t = 1000)]
        hold_ms: u32,
    },
    /// Toggle one PWM channel on and off
    Blink {
        #[arg(long)]
        channel: u8,
        #[arg(long)]
        duty: u16,
        #[arg(long, default_value_t = 10)]
        cycles: u32,
        #[arg(long, default_value_t = 1000)]
        period_ms: u32,
    },
    /// Run one motor briefly in one direction
    Jog {
        #[arg(long)]
        motor: usize,
        #[arg(long, value_enum)]
        direction: Direction,
        #[arg(long, default_value_t = 100)]
        duration_ms: u32,
    },
    /// Single-shot distance measurements
    Range {
        #[arg(long, default_value_t = 30)]
        samples: u32,
        /// Calibrate the sensor and use the calibrated ranging sequence
        #[arg(long)]
        extended: bool,
    },
    /// Continuous distance measurements
    Continuous {
        #[arg(long, default_value_t = 30)]
        samples: u32,
        /// Inter-measurement period, 0 for back to back
        #[arg(long, default_value_t = 50)]
        period_ms: u32,
    },
    /// Drive the motors from a depth recording
    Follow {
        #[arg(long)]
        frames: PathBuf,
    },
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    match parsed {
        Ok(address) if address <= 0x7F => Ok(address),
        _ => Err(format!("`{s}` is not a 7-bit I2C address")),
    }
}

fn load_config(cli: &Cli) -> Result<RigConfig> {
    let mut config = match &cli.config {
        Some(path) => RigConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => RigConfig::default(),
    };
    if let Some(address) = cli.pca_address {
        config.pca_address = address;
    }
    if let Some(address) = cli.tof_address {
        config.tof_address = address;
    }
    config.validate()?;
    Ok(config)
}

fn report(summary: &RangeSummary) {
    match summary.mean_mm() {
        Some(mean) => info!(
            mean_mm = mean,
            valid = summary.valid,
            out_of_range = summary.out_of_range,
            timeouts = summary.timeouts,
            "distance"
        ),
        None => info!(
            out_of_range = summary.out_of_range,
            timeouts = summary.timeouts,
            "no valid distance"
        ),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let bus = platform::bus();
    let mut wait = Delay;

    match cli.command {
        Commands::Pwm { channel, duty, frequency, hold_ms } => {
            let mut pwm = platform::open_pwm(&bus, config.pca_address)
                .with_context(|| format!("open {BUS_PATH}"))?;
            let frequency = frequency.unwrap_or(config.pwm_frequency_hz);
            scenarios::pwm_hold(
                &mut pwm, &mut wait, frequency, channel, duty, hold_ms,
            )?;
        }
        Commands::Blink { channel, duty, cycles, period_ms } => {
            let mut pwm = platform::open_pwm(&bus, config.pca_address)
                .with_context(|| format!("open {BUS_PATH}"))?;
            scenarios::blink(
                &mut pwm,
                &mut wait,
                config.pwm_frequency_hz,
                channel,
                duty,
                cycles,
                period_ms,
            )?;
        }
        Commands::Jog { motor, direction, duration_ms } => {
            let mut pwm = platform::open_pwm(&bus, config.pca_address)
                .with_context(|| format!("open {BUS_PATH}"))?;
            scenarios::jog(
                &mut pwm,
                &mut wait,
                config.pwm_frequency_hz,
                motor,
                direction,
                duration_ms,
            )?;
        }
        Commands::Range { samples, extended } => {
            let mut tof = platform::open_range_sensor(&bus, config.tof_address)
                .with_context(|| format!("open {BUS_PATH}"))?;
            let summary = scenarios::range(&mut tof, &config, samples, extended)?;
            report(&summary);
        }
        Commands::Continuous { samples, period_ms } => {
            let mut tof = platform::open_range_sensor(&bus, config.tof_address)
                .with_context(|| format!("open {BUS_PATH}"))?;
            let summary =
                scenarios::continuous(&mut tof, &config, samples, period_ms)?;
            report(&summary);
        }
        Commands::Follow { frames } => {
            let file = File::open(&frames)
                .with_context(|| format!("open {}", frames.display()))?;
            let mut source = ReplaySource::new(BufReader::new(file))
                .with_context(|| format!("read header of {}", frames.display()))?;
            let mut pwm = platform::open_pwm(&bus, config.pca_address)
                .with_context(|| format!("open {BUS_PATH}"))?;
            let states =
                scenarios::follow(&mut pwm, &mut wait, &mut source, &config)?;
            for (motor, state) in states.iter().enumerate() {
                info!(motor, position_mm = state.position_mm, "final position");
            }
        }
    }

    Ok(())
}
