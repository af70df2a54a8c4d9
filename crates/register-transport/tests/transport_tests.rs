use embedded_hal::i2c::ErrorKind as BusErrorKind;
use register_transport::mock::{MockError, MockI2c, Transfer};
use register_transport::{
    BigEndian, Direction, LittleEndian, RegisterTransaction, RegisterTransport,
    TransportError, MAX_PAYLOAD,
};

const ADDR: u8 = 0x29;

#[test]
fn word_round_trip_little_endian() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, LittleEndian>::new(mock.clone(), ADDR);

    regs.write_word(0x06, 0x0ABC).unwrap();

    assert_eq!(mock.registers(0x06, 2), vec![0xBC, 0x0A]);
    assert_eq!(regs.read_word(0x06).unwrap(), 0x0ABC);
}

#[test]
fn word_round_trip_big_endian() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, BigEndian>::new(mock.clone(), ADDR);

    regs.write_word(0x44, 0x0190).unwrap();

    assert_eq!(mock.registers(0x44, 2), vec![0x01, 0x90]);
    assert_eq!(regs.read_word(0x44).unwrap(), 400);
}

#[test]
fn dword_uses_declared_byte_order() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, BigEndian>::new(mock.clone(), ADDR);

    regs.write_dword(0x04, 0x1234_5678).unwrap();

    assert_eq!(mock.writes(), vec![vec![0x04, 0x12, 0x34, 0x56, 0x78]]);
    assert_eq!(regs.read_dword(0x04).unwrap(), 0x1234_5678);
}

#[test]
fn write_is_one_message_with_register_first() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, LittleEndian>::new(mock.clone(), ADDR);

    regs.write_bytes(0x10, &[1, 2, 3]).unwrap();

    assert_eq!(
        mock.transfers(),
        vec![Transfer::Write { address: ADDR, bytes: vec![0x10, 1, 2, 3] }]
    );
}

#[test]
fn read_selects_register_then_reads_in_one_transaction() {
    let mock = MockI2c::new(ADDR);
    mock.set_registers(0xC0, &[0xEE, 0xAA]);
    let mut regs = RegisterTransport::<_, BigEndian>::new(mock.clone(), ADDR);

    let mut buf = [0u8; 2];
    regs.read_bytes(0xC0, &mut buf).unwrap();

    assert_eq!(buf, [0xEE, 0xAA]);
    assert_eq!(
        mock.transfers(),
        vec![
            Transfer::Write { address: ADDR, bytes: vec![0xC0] },
            Transfer::Read { address: ADDR, register: 0xC0, len: 2 },
        ]
    );
}

#[test]
fn write_words_frames_a_single_burst() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, LittleEndian>::new(mock.clone(), ADDR);

    regs.write_words(0x06, &[0x0001, 0x0FFF]).unwrap();

    assert_eq!(mock.writes(), vec![vec![0x06, 0x01, 0x00, 0xFF, 0x0F]]);
}

#[test]
fn oversized_payload_is_rejected_before_the_bus() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, LittleEndian>::new(mock.clone(), ADDR);

    let data = [0u8; MAX_PAYLOAD + 1];
    assert_eq!(regs.write_bytes(0x00, &data), Err(TransportError::PayloadTooLong));
    assert!(mock.transfers().is_empty());

    let words = [0u16; MAX_PAYLOAD / 2 + 1];
    assert_eq!(regs.write_words(0x00, &words), Err(TransportError::PayloadTooLong));
}

#[test]
fn bus_error_is_surfaced_and_recorded() {
    let mock = MockI2c::new(ADDR);
    let mut regs = RegisterTransport::<_, LittleEndian>::new(mock.clone(), ADDR);

    mock.fail_register(Some(0x01));
    assert_eq!(
        regs.write_byte(0x01, 0x04),
        Err(TransportError::I2c(MockError::Injected))
    );
    assert_eq!(regs.last_status(), Some(BusErrorKind::Other));

    mock.fail_register(None);
    regs.write_byte(0x01, 0x04).unwrap();
    assert_eq!(regs.last_status(), None);
}

#[test]
fn wrong_address_is_not_acknowledged() {
    let mock = MockI2c::new(0x40);
    let mut regs = RegisterTransport::<_, LittleEndian>::new(mock, ADDR);

    assert_eq!(
        regs.read_byte(0x00),
        Err(TransportError::I2c(MockError::NoAcknowledge))
    );
    assert!(matches!(regs.last_status(), Some(BusErrorKind::NoAcknowledge(_))));
}

#[test]
fn modify_byte_reads_then_writes_back() {
    let mock = MockI2c::new(ADDR);
    mock.set_register(0x89, 0x20);
    let mut regs = RegisterTransport::<_, BigEndian>::new(mock.clone(), ADDR);

    regs.modify_byte(0x89, |v| v | 0x01).unwrap();

    assert_eq!(mock.register(0x89), 0x21);
    assert_eq!(mock.reads_of(0x89), 1);
}

#[test]
fn raw_transactions_describe_and_run_one_access() {
    let mock = MockI2c::new(ADDR);
    mock.set_register(0x14, 0x5A);
    let mut i2c = mock.clone();

    let write = RegisterTransaction::write(ADDR, 0x14, &[0x01, 0x02]);
    assert_eq!(write.direction(), Direction::Write);
    assert_eq!(write.len(), 2);
    write.execute(&mut i2c).unwrap();

    let mut buf = [0u8; 1];
    let read = RegisterTransaction::read(ADDR, 0x14, &mut buf);
    assert_eq!(read.direction(), Direction::Read);
    assert!(!read.is_empty());
    read.execute(&mut i2c).unwrap();
    assert_eq!(buf, [0x01]);

    let empty = RegisterTransaction::write(ADDR, 0x00, &[]);
    assert!(empty.is_empty());

    assert_eq!(
        mock.transfers(),
        vec![
            Transfer::Write { address: ADDR, bytes: vec![0x14, 0x01, 0x02] },
            Transfer::Write { address: ADDR, bytes: vec![0x14] },
            Transfer::Read { address: ADDR, register: 0x14, len: 1 },
        ]
    );
}
