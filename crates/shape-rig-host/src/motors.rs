//! Linear actuators driven through H-bridges on the PCA9685.
//!
//! Motor `m` uses channel `2m` to extend and `2m + 1` to retract. There is no
//! position feedback: the bank integrates its own estimate from the drive
//! time of each control tick.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use pca9685::registers::MAX_TIME;
use pca9685::Pca9685;

use crate::config::MotionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

/// (extend, retract) channels of `motor`.
pub fn channels(motor: usize) -> (u8, u8) {
    let up = (motor * 2) as u8;
    (up, up + 1)
}

/// Drive `motor` fully in `direction`, or stop it with `None`.
pub fn drive<I2C, D>(
    pwm: &mut Pca9685<I2C, D>,
    motor: usize,
    direction: Option<Direction>,
) -> Result<(), pca9685::Error<I2C::Error>>
where
    I2C: I2c,
    D: DelayNs,
{
    let (up, down) = channels(motor);
    let (up_duty, down_duty) = match direction {
        Some(Direction::Up) => (MAX_TIME, 0),
        Some(Direction::Down) => (0, MAX_TIME),
        None => (0, 0),
    };
    pwm.set_duty_cycle(up, up_duty)?;
    pwm.set_duty_cycle(down, down_duty)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorState {
    pub position_mm: f32,
    pub target_mm: f32,
}

pub struct MotorBank {
    motors: Vec<MotorState>,
    motion: MotionConfig,
}

impl MotorBank {
    /// `count` motors, all assumed fully retracted.
    pub fn new(count: usize, motion: MotionConfig) -> Self {
        Self { motors: vec![MotorState::default(); count], motion }
    }

    pub fn states(&self) -> &[MotorState] {
        &self.motors
    }

    /// Update targets; `None` keeps a motor's previous target.
    pub fn set_targets(&mut self, targets: &[Option<f32>]) {
        for (motor, target) in self.motors.iter_mut().zip(targets) {
            if let Some(target) = target {
                motor.target_mm = target.clamp(0.0, self.motion.travel_mm);
            }
        }
    }

    /// Direction for each motor this tick. Motors outside the dead band
    /// advance their position estimate by one step.
    pub fn plan(&mut self) -> Vec<Option<Direction>> {
        let step = self.motion.step_mm();
        self.motors
            .iter_mut()
            .map(|motor| {
                let error = motor.target_mm - motor.position_mm;
                if error.abs() <= self.motion.dead_band_mm {
                    None
                } else if error > 0.0 {
                    motor.position_mm += step;
                    Some(Direction::Up)
                } else {
                    motor.position_mm -= step;
                    Some(Direction::Down)
                }
            })
            .collect()
    }

    /// Run one control tick on the hardware.
    pub fn step<I2C, D>(
        &mut self,
        pwm: &mut Pca9685<I2C, D>,
    ) -> Result<(), pca9685::Error<I2C::Error>>
    where
        I2C: I2c,
        D: DelayNs,
    {
        for (motor, direction) in self.plan().into_iter().enumerate() {
            drive(pwm, motor, direction)?;
        }
        Ok(())
    }
}
