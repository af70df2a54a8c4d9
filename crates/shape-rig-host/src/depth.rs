//! Depth frames and where they come from.
//!
//! The rig reads 11-bit raw depth from a structured-light camera. Capture
//! itself happens elsewhere; here frames arrive through [`DepthSource`], and
//! [`ReplaySource`] plays back a recording so scenarios run without a camera.
//!
//! Recording layout, all little-endian: a `u16` width and `u16` height, then
//! per frame a `u32` timestamp followed by `width × height` `u16` samples in
//! row-major order.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use crate::config::{GridConfig, MotionConfig};
use crate::error::{Error, Result};

/// Raw value the camera reports for "no reading".
pub const NO_DATA: u16 = 2047;

#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub width: usize,
    pub height: usize,
    pub timestamp: u32,
    pub samples: Vec<u16>,
}

impl DepthFrame {
    pub fn new(
        width: usize,
        height: usize,
        timestamp: u32,
        samples: Vec<u16>,
    ) -> Result<Self> {
        if samples.len() != width * height {
            return Err(Error::InvalidRecording(format!(
                "{} samples for a {width}x{height} frame",
                samples.len()
            )));
        }
        Ok(Self { width, height, timestamp, samples })
    }

    pub fn sample(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples.get(y * self.width + x).copied()
    }

    /// Mean raw depth over a `window`-pixel square centred on (`cx`, `cy`),
    /// skipping no-data samples and pixels outside the frame. `None` unless
    /// more than `min_samples` samples are valid.
    pub fn window_mean(
        &self,
        cx: usize,
        cy: usize,
        window: usize,
        min_samples: usize,
    ) -> Option<f32> {
        let half = window / 2;
        let (x0, y0) = (cx.saturating_sub(half), cy.saturating_sub(half));
        let (x1, y1) =
            ((cx + window - half).min(self.width), (cy + window - half).min(self.height));

        let mut sum = 0u64;
        let mut count = 0usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let d = self.samples[y * self.width + x];
                if is_valid(d) {
                    sum += d as u64;
                    count += 1;
                }
            }
        }
        (count > min_samples).then(|| sum as f32 / count as f32)
    }
}

pub fn is_valid(raw: u16) -> bool {
    raw > 0 && raw < NO_DATA
}

/// Approximate metric depth for an 11-bit raw reading.
pub fn raw_to_mm(raw: f32) -> f32 {
    1000.0 / (raw * -0.00307 + 3.33)
}

/// Actuator extension for an object `depth_mm` away: full travel at
/// `near_mm`, none at `far_mm`, linear in between and clamped outside.
pub fn extension_for(depth_mm: f32, motion: &MotionConfig) -> f32 {
    let span = motion.far_mm - motion.near_mm;
    let extension = motion.travel_mm * (1.0 - (depth_mm - motion.near_mm) / span);
    extension.clamp(0.0, motion.travel_mm)
}

/// Target extension for every motor of `grid`, `None` where its zone had
/// too few valid samples.
pub fn zone_targets(
    frame: &DepthFrame,
    grid: &GridConfig,
    motion: &MotionConfig,
) -> Vec<Option<f32>> {
    let zone_w = frame.width / grid.cols;
    let zone_h = frame.height / grid.rows;

    let mut targets = Vec::with_capacity(grid.motors());
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let cx = col * zone_w + zone_w / 2;
            let cy = row * zone_h + zone_h / 2;
            let target = frame
                .window_mean(cx, cy, motion.window_px, motion.min_samples)
                .map(|raw| extension_for(raw_to_mm(raw), motion));
            targets.push(target);
        }
    }
    targets
}

pub trait DepthSource {
    /// Next frame, `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<DepthFrame>>;
}

pub struct ReplaySource<R> {
    reader: R,
    width: usize,
    height: usize,
}

impl<R: Read> ReplaySource<R> {
    /// Read the recording header.
    pub fn new(mut reader: R) -> Result<Self> {
        let width = reader.read_u16::<LittleEndian>()? as usize;
        let height = reader.read_u16::<LittleEndian>()? as usize;
        if width == 0 || height == 0 {
            return Err(Error::InvalidRecording(format!(
                "frame size {width}x{height}"
            )));
        }
        Ok(Self { reader, width, height })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

impl<R: Read> DepthSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<DepthFrame>> {
        let timestamp = match self.reader.read_u32::<LittleEndian>() {
            Ok(ts) => ts,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut samples = vec![0u16; self.width * self.height];
        self.reader
            .read_u16_into::<LittleEndian>(&mut samples)
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => Error::InvalidRecording(format!(
                    "frame at {timestamp} is truncated"
                )),
                _ => e.into(),
            })?;

        DepthFrame::new(self.width, self.height, timestamp, samples).map(Some)
    }
}
