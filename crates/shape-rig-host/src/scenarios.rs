//! Bench scenarios behind the `shape-rig` subcommands.
//!
//! Each scenario takes already-constructed drivers plus a delay for its own
//! pacing, so it runs the same against the Linux bus and the test mock.
//! Scenarios are bounded; none waits for a signal to stop.

use anyhow::{bail, Context, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use pca9685::Pca9685;
use tracing::{debug, info, warn};
use vl53l0x::{Range, Vl53l0x};

use crate::config::{RigConfig, MAX_MOTORS};
use crate::depth::{zone_targets, DepthSource};
use crate::motors::{drive, Direction, MotorBank, MotorState};

/// Initialise the controller and program the configured frequency.
pub fn init_controller<I2C, D>(
    pwm: &mut Pca9685<I2C, D>,
    frequency_hz: u16,
) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
{
    pwm.init()
        .with_context(|| format!("PCA9685 at {:#04x} init", pwm.address()))?;
    pwm.set_frequency(frequency_hz)
        .with_context(|| format!("set PWM frequency to {frequency_hz} Hz"))?;
    info!(address = pwm.address(), frequency_hz, "PWM controller ready");
    Ok(())
}

/// Hold one channel at `duty` for `hold_ms`, then switch it off.
pub fn pwm_hold<I2C, D, W>(
    pwm: &mut Pca9685<I2C, D>,
    wait: &mut W,
    frequency_hz: u16,
    channel: u8,
    duty: u16,
    hold_ms: u32,
) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
    W: DelayNs,
{
    init_controller(pwm, frequency_hz)?;
    pwm.set_duty_cycle(channel, duty)
        .with_context(|| format!("set channel {channel} duty to {duty}"))?;
    info!(channel, duty, hold_ms, "holding");
    wait.delay_ms(hold_ms);
    pwm.set_duty_cycle(channel, 0)
        .with_context(|| format!("switch channel {channel} off"))?;
    Ok(())
}

/// Alternate `channel` between `duty` and off, `period_ms` each.
pub fn blink<I2C, D, W>(
    pwm: &mut Pca9685<I2C, D>,
    wait: &mut W,
    frequency_hz: u16,
    channel: u8,
    duty: u16,
    cycles: u32,
    period_ms: u32,
) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
    W: DelayNs,
{
    init_controller(pwm, frequency_hz)?;
    for cycle in 0..cycles {
        debug!(cycle, "on");
        pwm.set_duty_cycle(channel, duty)
            .with_context(|| format!("blink cycle {cycle}: channel {channel} on"))?;
        wait.delay_ms(period_ms);
        pwm.set_duty_cycle(channel, 0)
            .with_context(|| format!("blink cycle {cycle}: channel {channel} off"))?;
        wait.delay_ms(period_ms);
    }
    info!(channel, cycles, "blink done");
    Ok(())
}

/// Drive one motor for `duration_ms`, then stop it.
pub fn jog<I2C, D, W>(
    pwm: &mut Pca9685<I2C, D>,
    wait: &mut W,
    frequency_hz: u16,
    motor: usize,
    direction: Direction,
    duration_ms: u32,
) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
    W: DelayNs,
{
    if motor >= MAX_MOTORS {
        bail!("motor {motor} outside 0..{MAX_MOTORS}");
    }
    init_controller(pwm, frequency_hz)?;
    drive(pwm, motor, Some(direction))
        .with_context(|| format!("drive motor {motor} {direction:?}"))?;
    wait.delay_ms(duration_ms);
    drive(pwm, motor, None).with_context(|| format!("stop motor {motor}"))?;
    info!(motor, ?direction, duration_ms, "jog done");
    Ok(())
}

/// Tally of a ranging run. Out-of-range readings and timeouts are counted
/// apart from valid distances and never enter the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeSummary {
    pub valid: u32,
    pub out_of_range: u32,
    pub timeouts: u32,
    sum_mm: u64,
}

impl RangeSummary {
    pub fn mean_mm(&self) -> Option<f32> {
        (self.valid > 0).then(|| self.sum_mm as f32 / self.valid as f32)
    }

    fn record(&mut self, range: Range) {
        match range {
            Range::Millimeters(mm) => {
                self.valid += 1;
                self.sum_mm += mm as u64;
            }
            Range::OutOfRange(raw) => {
                self.out_of_range += 1;
                debug!(raw, "out of range");
            }
        }
    }
}

/// Sort one measurement into `summary`. Timeouts are counted; any other
/// failure ends the run.
fn tally<E>(
    summary: &mut RangeSummary,
    sample: u32,
    result: core::result::Result<Range, vl53l0x::Error<E>>,
) -> core::result::Result<bool, vl53l0x::Error<E>> {
    match result {
        Ok(range) => {
            summary.record(range);
            Ok(true)
        }
        Err(vl53l0x::Error::Timeout) => {
            summary.timeouts += 1;
            warn!(sample, "measurement timed out");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Take `samples` single-shot measurements. `extended` runs the calibrated
/// initialisation and ranging sequence, otherwise the bare protocol is used.
pub fn range<I2C, D>(
    tof: &mut Vl53l0x<I2C, D>,
    config: &RigConfig,
    samples: u32,
    extended: bool,
) -> Result<RangeSummary>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
{
    tof.set_io_timeout(config.io_timeout_ms);
    if extended {
        tof.init_extended(config.timing_budget_us)
            .with_context(|| format!("VL53L0X at {:#04x} init", tof.address()))?;
    } else {
        tof.init()
            .with_context(|| format!("VL53L0X at {:#04x} init", tof.address()))?;
    }
    info!(address = tof.address(), extended, "ranging sensor ready");

    let mut summary = RangeSummary::default();
    for sample in 0..samples {
        let result = if extended {
            tof.read_range_single_millimeters()
        } else {
            tof.measure(config.measure_timeout_ms)
        };
        let completed = tally(&mut summary, sample, result)
            .with_context(|| format!("measurement {sample}"))?;
        if !completed {
            // Make sure nothing is in flight before the next start.
            tof.reset().context("stop timed-out measurement")?;
        }
    }
    Ok(summary)
}

/// Calibrated continuous ranging, `samples` readings `period_ms` apart.
pub fn continuous<I2C, D>(
    tof: &mut Vl53l0x<I2C, D>,
    config: &RigConfig,
    samples: u32,
    period_ms: u32,
) -> Result<RangeSummary>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
{
    tof.set_io_timeout(config.io_timeout_ms);
    tof.init_extended(config.timing_budget_us)
        .with_context(|| format!("VL53L0X at {:#04x} init", tof.address()))?;
    tof.start_continuous(period_ms)
        .context("start continuous ranging")?;

    let mut summary = RangeSummary::default();
    let run: Result<()> = (0..samples).try_for_each(|sample| {
        tally(&mut summary, sample, tof.read_range_continuous())
            .with_context(|| format!("continuous sample {sample}"))?;
        Ok(())
    });
    let stopped = tof.stop_continuous().context("stop continuous ranging");

    run?;
    stopped?;
    Ok(summary)
}

/// Drive the motor bank from depth frames until the source runs dry.
/// Every channel is switched off at the end, also after a failure.
pub fn follow<I2C, D, W, S>(
    pwm: &mut Pca9685<I2C, D>,
    wait: &mut W,
    source: &mut S,
    config: &RigConfig,
) -> Result<Vec<MotorState>>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
    W: DelayNs,
    S: DepthSource,
{
    init_controller(pwm, config.pwm_frequency_hz)?;
    let mut bank = MotorBank::new(config.grid.motors(), config.motion);

    let run = follow_frames(pwm, wait, source, config, &mut bank);
    let stopped = pwm.all_off().context("switch all channels off");

    let frames = run?;
    stopped?;
    info!(frames, "follow done");
    Ok(bank.states().to_vec())
}

fn follow_frames<I2C, D, W, S>(
    pwm: &mut Pca9685<I2C, D>,
    wait: &mut W,
    source: &mut S,
    config: &RigConfig,
    bank: &mut MotorBank,
) -> Result<u32>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
    D: DelayNs,
    W: DelayNs,
    S: DepthSource,
{
    let mut frames = 0;
    while let Some(frame) = source.next_frame().context("read depth frame")? {
        let targets = zone_targets(&frame, &config.grid, &config.motion);
        bank.set_targets(&targets);
        bank.step(pwm)
            .with_context(|| format!("drive motors for frame {}", frame.timestamp))?;

        for (motor, state) in bank.states().iter().enumerate() {
            debug!(
                motor,
                position_mm = state.position_mm,
                target_mm = state.target_mm,
                "tick"
            );
        }
        frames += 1;
        wait.delay_ms(config.motion.tick_ms);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{DepthFrame, NO_DATA};
    use pca9685::registers::{channel_base, MODE1};
    use register_transport::mock::{MockDelay, MockI2c};
    use vl53l0x::registers::{
        MODEL_ID, RESULT_RANGE_STATUS, RESULT_RANGE_VALUE, SYSRANGE_START,
    };

    fn controller() -> (Pca9685<MockI2c, MockDelay>, MockI2c) {
        let mock = MockI2c::new(pca9685::DEFAULT_ADDRESS);
        // MODE1 as read before sleep, then with RESTART acknowledged.
        mock.script_reads(MODE1, &[0x00, 0x90]);
        (Pca9685::new(mock.clone(), MockDelay::new()), mock)
    }

    fn sensor() -> (Vl53l0x<MockI2c, MockDelay>, MockI2c) {
        let mock = MockI2c::new(vl53l0x::DEFAULT_ADDRESS);
        mock.set_register(MODEL_ID, 0xEE);
        (Vl53l0x::new(mock.clone(), MockDelay::new()), mock)
    }

    struct Frames(Vec<DepthFrame>);

    impl DepthSource for Frames {
        fn next_frame(&mut self) -> crate::Result<Option<DepthFrame>> {
            Ok((!self.0.is_empty()).then(|| self.0.remove(0)))
        }
    }

    #[test]
    fn pwm_hold_switches_channel_off_afterwards() {
        let (mut pwm, mock) = controller();
        let mut wait = MockDelay::new();

        pwm_hold(&mut pwm, &mut wait, 50, 4, 2048, 250).unwrap();

        assert_eq!(wait.calls(), vec![250_000_000]);
        assert_eq!(mock.registers(channel_base(4), 4), vec![0, 0, 0, 0]);
        assert!(mock.writes().contains(&vec![channel_base(4), 0, 0, 0x00, 0x08]));
    }

    #[test]
    fn blink_alternates() {
        let (mut pwm, mock) = controller();
        let mut wait = MockDelay::new();

        blink(&mut pwm, &mut wait, 50, 1, 2500, 3, 100).unwrap();

        let channel_writes: Vec<_> = mock
            .writes()
            .into_iter()
            .filter(|w| w[0] == channel_base(1))
            .collect();
        assert_eq!(channel_writes.len(), 6);
        assert_eq!(wait.calls().len(), 6);
    }

    #[test]
    fn jog_rejects_unknown_motor() {
        let (mut pwm, mock) = controller();
        let mut wait = MockDelay::new();

        assert!(jog(&mut pwm, &mut wait, 50, 8, Direction::Up, 100).is_err());
        assert!(mock.transfers().is_empty());
    }

    #[test]
    fn jog_drives_then_stops() {
        let (mut pwm, mock) = controller();
        let mut wait = MockDelay::new();

        jog(&mut pwm, &mut wait, 50, 2, Direction::Down, 100).unwrap();

        assert!(mock
            .writes()
            .contains(&vec![channel_base(5), 0xFF, 0x0F, 0x00, 0x00]));
        assert_eq!(mock.registers(channel_base(4), 8), vec![0; 8]);
        assert_eq!(wait.calls(), vec![100_000_000]);
    }

    #[test]
    fn init_failure_names_the_device() {
        let mock = MockI2c::new(pca9685::DEFAULT_ADDRESS);
        let mut pwm = Pca9685::new(mock, MockDelay::new());

        let err = init_controller(&mut pwm, 50).unwrap_err();

        assert_eq!(err.to_string(), "PCA9685 at 0x40 init");
    }

    #[test]
    fn range_counts_out_of_range_apart_from_mean() {
        let (mut tof, mock) = sensor();
        mock.set_registers(RESULT_RANGE_VALUE, &[0x01, 0x90]);

        let summary = range(&mut tof, &RigConfig::default(), 3, false).unwrap();
        assert_eq!(summary.valid, 3);
        assert_eq!(summary.mean_mm(), Some(400.0));

        mock.set_registers(RESULT_RANGE_VALUE, &[0x1F, 0xFE]);
        let summary = range(&mut tof, &RigConfig::default(), 2, false).unwrap();
        assert_eq!(summary.valid, 0);
        assert_eq!(summary.out_of_range, 2);
        assert_eq!(summary.mean_mm(), None);
    }

    #[test]
    fn range_counts_timeouts_and_resets() {
        let (mut tof, mock) = sensor();
        mock.set_register(RESULT_RANGE_STATUS, 0x01);
        let config = RigConfig { measure_timeout_ms: 4, ..RigConfig::default() };

        let summary = range(&mut tof, &config, 2, false).unwrap();

        assert_eq!(summary.timeouts, 2);
        assert_eq!(summary.valid, 0);
        // start, stop, start, stop
        let starts: Vec<u8> = mock
            .writes()
            .into_iter()
            .filter(|w| w[0] == SYSRANGE_START)
            .map(|w| w[1])
            .collect();
        assert_eq!(starts, vec![0x01, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn range_aborts_on_wrong_identity() {
        let (mut tof, mock) = sensor();
        mock.set_register(MODEL_ID, 0x00);

        let err = range(&mut tof, &RigConfig::default(), 1, false).unwrap_err();
        assert!(format!("{err:#}").contains("unexpected VL53L0X MODEL_ID"));
    }

    #[test]
    fn follow_steps_toward_targets_and_switches_off() {
        let (mut pwm, mock) = controller();
        let mut wait = MockDelay::new();
        let config = RigConfig::default();

        // Raw 700 is roughly 850 mm, well inside the tracking range.
        let near = DepthFrame::new(64, 48, 0, vec![700; 64 * 48]).unwrap();
        let empty = DepthFrame::new(64, 48, 1, vec![NO_DATA; 64 * 48]).unwrap();
        let mut source = Frames(vec![near.clone(), empty, near]);

        let states = follow(&mut pwm, &mut wait, &mut source, &config).unwrap();

        assert_eq!(states.len(), 1);
        assert!(states[0].target_mm > 1.5);
        assert!((states[0].position_mm - 3.0 * 0.16).abs() < 1e-4);
        assert_eq!(wait.calls(), vec![20_000_000; 3]);
        assert_eq!(mock.registers(channel_base(0), 64), vec![0; 64]);
    }

    #[test]
    fn follow_switches_off_after_failure() {
        let (mut pwm, mock) = controller();
        let mut wait = MockDelay::new();

        struct Broken;
        impl DepthSource for Broken {
            fn next_frame(&mut self) -> crate::Result<Option<DepthFrame>> {
                Err(crate::Error::InvalidRecording("bad header".into()))
            }
        }

        let err = follow(&mut pwm, &mut wait, &mut Broken, &RigConfig::default())
            .unwrap_err();

        assert_eq!(err.to_string(), "read depth frame");
        let offs = mock
            .writes()
            .into_iter()
            .filter(|w| w.len() == 5 && w[1..] == [0, 0, 0, 0])
            .count();
        assert_eq!(offs, 16);
    }
}
