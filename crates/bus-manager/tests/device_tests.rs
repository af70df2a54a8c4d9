use core::cell::RefCell;
use std::rc::Rc;

use bus_manager::{BusDevice, BusFactory, BusManager, SharedBus};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation};

/// Bus that records every transfer it sees.
#[derive(Default)]
struct RecordingI2c {
    log: Rc<RefCell<Vec<(u8, Vec<u8>, usize)>>>,
    closed: Rc<RefCell<bool>>,
}

#[derive(Debug, PartialEq)]
struct RecordingError;

impl i2c::Error for RecordingError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for RecordingI2c {
    type Error = RecordingError;
}

impl I2c for RecordingI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut written = Vec::new();
        let mut read_len = 0;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => written.extend_from_slice(bytes),
                Operation::Read(buf) => {
                    buf.fill(0xA5);
                    read_len += buf.len();
                }
            }
        }
        self.log.borrow_mut().push((address, written, read_len));
        Ok(())
    }
}

struct RecordingResources {
    log: Rc<RefCell<Vec<(u8, Vec<u8>, usize)>>>,
    closed: Rc<RefCell<bool>>,
}

struct RecordingFactory;

impl BusFactory for RecordingFactory {
    type Bus = SharedBus<NoopRawMutex, RecordingI2c>;
    type Resources = RecordingResources;
    type Destructor = RecordingResources;
    type Error = RecordingError;

    fn create(
        resources: Self::Resources,
    ) -> Result<(Self::Bus, Self::Destructor), (Self::Error, Self::Resources)>
    {
        let i2c = RecordingI2c {
            log: resources.log.clone(),
            closed: resources.closed.clone(),
        };
        *resources.closed.borrow_mut() = false;
        Ok((SharedBus::new(RefCell::new(i2c)), resources))
    }

    fn destroy(
        bus: Self::Bus,
        destructor: Self::Destructor,
    ) -> Result<Self::Resources, (Self::Error, Self::Resources)> {
        let i2c = bus.into_inner().into_inner();
        *i2c.closed.borrow_mut() = true;
        Ok(destructor)
    }
}

fn make_manager() -> (
    BusManager<NoopRawMutex, RecordingFactory>,
    Rc<RefCell<Vec<(u8, Vec<u8>, usize)>>>,
    Rc<RefCell<bool>>,
) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let closed = Rc::new(RefCell::new(true));
    let resources =
        RecordingResources { log: log.clone(), closed: closed.clone() };
    (BusManager::new(resources), log, closed)
}

#[test]
fn devices_share_one_bus_and_keep_addresses() {
    let (mgr, log, closed) = make_manager();

    let mut pwm = BusDevice::acquire(&mgr).unwrap();
    let mut tof = BusDevice::acquire(&mgr).unwrap();
    assert!(!*closed.borrow());
    assert_eq!(mgr.user_count(), 2);

    pwm.write(0x40, &[0x00, 0x20]).unwrap();
    let mut buf = [0u8; 2];
    tof.write_read(0x29, &[0x1E], &mut buf).unwrap();

    assert_eq!(buf, [0xA5, 0xA5]);
    let log = log.borrow();
    assert_eq!(log[0], (0x40, vec![0x00, 0x20], 0));
    assert_eq!(log[1], (0x29, vec![0x1E], 2));
}

#[test]
fn write_read_is_a_single_locked_transfer() {
    let (mgr, log, _) = make_manager();
    let mut dev = BusDevice::acquire(&mgr).unwrap();

    let mut buf = [0u8; 4];
    dev.write_read(0x29, &[0xC0], &mut buf).unwrap();

    // One entry: the address byte and the read share a transaction.
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn dropping_devices_closes_bus_after_last() {
    let (mgr, _, closed) = make_manager();

    let a = BusDevice::acquire(&mgr).unwrap();
    let b = BusDevice::acquire(&mgr).unwrap();

    drop(a);
    assert!(!*closed.borrow());
    assert_eq!(b.close(), Ok(()));
    assert!(*closed.borrow());
    assert_eq!(mgr.is_active(), Some(false));
}
