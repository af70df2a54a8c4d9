use pca9685::registers::{channel_base, Mode1, Mode2, MODE1, MODE2, PRE_SCALE};
use pca9685::{Error, Pca9685, State, DEFAULT_ADDRESS};
use register_transport::mock::{MockDelay, MockI2c};
use register_transport::ErrorKind;

fn driver() -> (Pca9685<MockI2c, MockDelay>, MockI2c, MockDelay) {
    let mock = MockI2c::new(DEFAULT_ADDRESS);
    let delay = MockDelay::new();
    (Pca9685::new(mock.clone(), delay.clone()), mock, delay)
}

#[test]
fn init_runs_reset_then_configures_50hz() {
    let (mut pwm, mock, delay) = driver();
    // MODE1 before sleep, then with RESTART and SLEEP set.
    mock.script_reads(MODE1, &[0x00, 0x90]);

    pwm.init().unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            vec![MODE1, 0x10],
            vec![MODE1, 0x80],
            vec![MODE1, 0x80],
            vec![MODE1, 0x20],
            vec![MODE2, 0x04],
            vec![MODE1, 0x30],
            vec![PRE_SCALE, 121],
            vec![MODE1, 0x20],
            vec![MODE1, 0xA0],
        ]
    );
    assert_eq!(delay.calls(), vec![1_000_000, 500_000, 500_000]);
    assert_eq!(pwm.state(), State::Configured);
    assert_eq!(pwm.prescale().unwrap(), 121);
}

#[test]
fn init_leaves_auto_increment_and_totem_pole_outputs() {
    let (mut pwm, mock, _) = driver();
    mock.script_reads(MODE1, &[0x00, 0x90]);

    pwm.init().unwrap();

    assert_eq!(pwm.mode1().unwrap(), Mode1::RESTART | Mode1::AI);
    assert_eq!(pwm.mode2().unwrap(), Mode2::OUTDRV);
}

#[test]
fn standalone_reset_returns_to_uninitialized() {
    let (mut pwm, mock, delay) = driver();
    mock.script_reads(MODE1, &[0x00, 0x90]);

    pwm.reset().unwrap();

    assert_eq!(pwm.state(), State::Uninitialized);
    assert_eq!(
        mock.writes(),
        vec![vec![MODE1, 0x10], vec![MODE1, 0x80], vec![MODE1, 0x80]]
    );
    assert_eq!(delay.total_ns(), 1_500_000);
    assert_eq!(pwm.mode1().unwrap(), Mode1::RESTART);
}

#[test]
fn reset_without_restart_ack_is_protocol_error() {
    let (mut pwm, mock, _) = driver();

    let err = pwm.reset().unwrap_err();

    assert_eq!(err, Error::RestartNotAcknowledged(0x10));
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(pwm.state(), State::Faulted);
    // Only the sleep write went out.
    assert_eq!(mock.writes(), vec![vec![MODE1, 0x10]]);
}

#[test]
fn init_recovers_from_faulted() {
    let (mut pwm, mock, _) = driver();
    assert!(pwm.init().is_err());
    assert_eq!(pwm.state(), State::Faulted);

    mock.set_register(MODE1, 0x00);
    mock.script_reads(MODE1, &[0x00, 0x90]);
    pwm.init().unwrap();
    assert_eq!(pwm.state(), State::Configured);
}

#[test]
fn frequency_bounds_are_checked_before_any_transfer() {
    let (mut pwm, mock, delay) = driver();

    for hz in [0, 23, 1527, u16::MAX] {
        let err = pwm.set_frequency(hz).unwrap_err();
        assert_eq!(err, Error::InvalidFrequency(hz));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    assert!(mock.transfers().is_empty());
    assert!(delay.calls().is_empty());
    assert_eq!(pwm.state(), State::Uninitialized);
}

#[test]
fn frequency_limits_program_expected_prescale() {
    let (mut pwm, mock, _) = driver();

    pwm.set_frequency(24).unwrap();
    assert_eq!(mock.register(PRE_SCALE), 253);

    pwm.set_frequency(1526).unwrap();
    assert_eq!(mock.register(PRE_SCALE), 3);

    pwm.set_frequency(60).unwrap();
    assert_eq!(pwm.prescale().unwrap(), 101);
}

#[test]
fn set_frequency_sleeps_and_restores_mode1() {
    let (mut pwm, mock, delay) = driver();
    mock.set_register(MODE1, 0xA1);

    pwm.set_frequency(200).unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            vec![MODE1, 0x31],
            vec![PRE_SCALE, 30],
            vec![MODE1, 0xA1],
            vec![MODE1, 0xA1],
        ]
    );
    assert_eq!(delay.calls(), vec![500_000]);
}

#[test]
fn channel_time_reads_back_what_was_written() {
    let (mut pwm, mock, _) = driver();

    let cases = [
        ((0, 2048), (0, 2048)),
        ((100, 300), (100, 300)),
        ((3000, 1000), (1000, 3000)),
        ((5000, 10), (10, 4095)),
        ((4095, 4095), (4095, 4095)),
    ];
    for (channel, ((on, off), expected)) in cases.into_iter().enumerate() {
        let channel = channel as u8;
        pwm.set_channel_time(channel, on, off).unwrap();
        assert_eq!(pwm.channel_time(channel).unwrap(), expected);
    }

    // ON_L, ON_H, OFF_L, OFF_H in little-endian order.
    assert_eq!(mock.registers(channel_base(1), 4), vec![100, 0, 0x2C, 0x01]);
}

#[test]
fn channel_write_is_one_burst() {
    let (mut pwm, mock, _) = driver();

    pwm.set_channel_time(15, 0x123, 0x456).unwrap();

    assert_eq!(
        mock.writes(),
        vec![vec![channel_base(15), 0x23, 0x01, 0x56, 0x04]]
    );
}

#[test]
fn duty_cycle_encoding() {
    let (mut pwm, _, _) = driver();

    let cases = [
        (0, (0, 0)),
        (1, (0, 1)),
        (2048, (0, 2048)),
        (4094, (0, 4094)),
        (4095, (4095, 0)),
        (9000, (4095, 0)),
    ];
    for (duty, expected) in cases {
        pwm.set_duty_cycle(3, duty).unwrap();
        assert_eq!(pwm.channel_time(3).unwrap(), expected, "duty {duty}");
    }
}

#[test]
fn invalid_channel_is_rejected_without_traffic() {
    let (mut pwm, mock, _) = driver();

    assert_eq!(pwm.set_duty_cycle(16, 100), Err(Error::InvalidChannel(16)));
    assert_eq!(pwm.set_channel_time(200, 0, 1), Err(Error::InvalidChannel(200)));
    assert_eq!(pwm.channel_time(16), Err(Error::InvalidChannel(16)));

    assert!(mock.transfers().is_empty());
    assert_eq!(pwm.state(), State::Uninitialized);
}

#[test]
fn set_all_writes_every_channel() {
    let (mut pwm, _, _) = driver();
    let on: [u16; 16] = core::array::from_fn(|i| i as u16);
    let off: [u16; 16] = core::array::from_fn(|i| 1000 + i as u16);

    pwm.set_all_channel_times(&on, &off).unwrap();

    for channel in 0..16u8 {
        assert_eq!(
            pwm.channel_time(channel).unwrap(),
            (channel as u16, 1000 + channel as u16)
        );
    }
}

#[test]
fn set_all_stops_at_first_failure_and_keeps_earlier_channels() {
    let (mut pwm, mock, _) = driver();
    mock.fail_register(Some(channel_base(5)));

    let on = [0u16; 16];
    let off = [500u16; 16];
    let err = pwm.set_all_channel_times(&on, &off).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(pwm.state(), State::Faulted);
    assert_eq!(mock.writes().len(), 5);
    assert_eq!(mock.registers(channel_base(4), 4), vec![0, 0, 0xF4, 0x01]);
    assert_eq!(mock.registers(channel_base(6), 4), vec![0, 0, 0, 0]);
}

#[test]
fn all_off_clears_every_channel() {
    let (mut pwm, mock, _) = driver();
    for channel in 0..16u8 {
        pwm.set_duty_cycle(channel, 4095).unwrap();
    }

    pwm.all_off().unwrap();

    assert_eq!(mock.registers(channel_base(0), 64), vec![0u8; 64]);
}

#[test]
fn bus_failure_faults_driver() {
    let (mut pwm, mock, _) = driver();
    mock.fail_all(true);

    let err = pwm.set_duty_cycle(0, 100).unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(pwm.state(), State::Faulted);
}

#[test]
fn custom_address_and_release() {
    let mock = MockI2c::new(0x41);
    let mut pwm = Pca9685::with_address(mock.clone(), MockDelay::new(), 0x41);
    assert_eq!(pwm.address(), 0x41);

    pwm.set_duty_cycle(0, 10).unwrap();
    let (_i2c, _delay) = pwm.release();
    assert_eq!(mock.registers(channel_base(0), 4), vec![0, 0, 10, 0]);
}
