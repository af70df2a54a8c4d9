use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use grounded::uninit::GroundedCell;
use portable_atomic::{AtomicUsize, Ordering};

use crate::error::BusError;
use crate::factory::BusFactory;
use crate::handle::BusHandle;

/// Phase state machine for the bus lifecycle.
enum Phase<F: BusFactory> {
    /// Bus is closed; resources are available.
    Idle(F::Resources),
    /// Bus is open and stored in `bus_cell`.
    Active(F::Destructor),
    /// Unrecoverable error state (should not normally be reached).
    Poisoned,
}

/// Reference-counted bus lifecycle manager.
///
/// The bus is opened on the first `acquire()` and stays open while at least
/// one [`BusHandle`] exists. Dropping the last handle closes it, so a later
/// `acquire()` reopens it. Invariant: the phase is `Active` iff the user
/// count is non-zero.
pub struct BusManager<M: RawMutex, F: BusFactory> {
    bus_cell: GroundedCell<F::Bus>,
    state: Mutex<M, RefCell<Phase<F>>>,
    users: AtomicUsize,
}

impl<M: RawMutex, F: BusFactory> BusManager<M, F> {
    /// Create a new bus manager with the given resources. Nothing is opened yet.
    pub const fn new(resources: F::Resources) -> Self {
        Self {
            bus_cell: GroundedCell::uninit(),
            state: Mutex::new(RefCell::new(Phase::Idle(resources))),
            users: AtomicUsize::new(0),
        }
    }

    /// Acquire a handle to the bus.
    ///
    /// If the bus is not open yet, it is created via the factory. A factory
    /// failure leaves the manager idle with its resources intact, so the
    /// caller may retry.
    pub fn acquire(&self) -> Result<BusHandle<'_, M, F>, BusError<F::Error>> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();

            match &*state {
                Phase::Idle(_) => {
                    // Take resources out, replacing with Poisoned temporarily.
                    let resources =
                        match core::mem::replace(&mut *state, Phase::Poisoned) {
                            Phase::Idle(r) => r,
                            _ => unreachable!(),
                        };

                    match F::create(resources) {
                        Ok((bus, destructor)) => {
                            // SAFETY: We hold the state lock and the phase was
                            // Idle, so the cell is uninit and nothing reads it.
                            unsafe {
                                self.bus_cell.get().write(bus);
                            }

                            self.users.store(1, Ordering::Release);
                            *state = Phase::Active(destructor);

                            Ok(BusHandle::new(self, self.bus_ptr()))
                        }
                        Err((err, resources)) => {
                            // Restore resources so the manager can try again later.
                            *state = Phase::Idle(resources);
                            Err(BusError::FactoryError(err))
                        }
                    }
                }
                Phase::Active(_) => {
                    self.users.fetch_add(1, Ordering::AcqRel);
                    Ok(BusHandle::new(self, self.bus_ptr()))
                }
                Phase::Poisoned => Err(BusError::Poisoned),
            }
        })
    }

    /// Check that the bus is closed.
    ///
    /// The bus closes itself when the last handle drops, so this never
    /// closes anything. Returns `Ok(())` when idle and `Err(InUse(n))` while
    /// `n` handles keep it open.
    pub fn try_release(&self) -> Result<(), BusError<F::Error>> {
        self.state.lock(|state| match &*state.borrow() {
            Phase::Idle(_) => Ok(()),
            Phase::Active(_) => {
                Err(BusError::InUse(self.users.load(Ordering::Acquire)))
            }
            Phase::Poisoned => Err(BusError::Poisoned),
        })
    }

    /// Returns the current number of active handles.
    pub fn user_count(&self) -> usize {
        self.users.load(Ordering::Relaxed)
    }

    /// Returns `Some(true)` if open, `Some(false)` if idle, `None` if poisoned.
    pub fn is_active(&self) -> Option<bool> {
        self.state.lock(|state| match &*state.borrow() {
            Phase::Idle(_) => Some(false),
            Phase::Active(_) => Some(true),
            Phase::Poisoned => None,
        })
    }

    /// Drop one user. The transition from one user to zero closes the bus.
    pub(crate) fn release_one(&self) -> Result<(), BusError<F::Error>> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();

            let previous = self.users.fetch_sub(1, Ordering::AcqRel);
            if previous == 0 {
                self.users.store(0, Ordering::Release);
                return Err(BusError::Poisoned);
            }
            if previous > 1 {
                return Ok(());
            }
            self.teardown(&mut state)
        })
    }

    fn bus_ptr(&self) -> *const F::Bus {
        self.bus_cell.get() as *const F::Bus
    }

    /// Close the bus. Caller holds the state lock and has just dropped the
    /// user count to zero.
    fn teardown(&self, state: &mut Phase<F>) -> Result<(), BusError<F::Error>> {
        let destructor = match core::mem::replace(state, Phase::Poisoned) {
            Phase::Active(d) => d,
            Phase::Idle(r) => {
                *state = Phase::Idle(r);
                return Ok(());
            }
            Phase::Poisoned => return Err(BusError::Poisoned),
        };

        // SAFETY: We hold the state lock and users == 0, so no live handles
        // exist. The bus was written during acquire(), and the cell is treated
        // as uninit from here on.
        let bus = unsafe { core::ptr::read(self.bus_ptr()) };

        match F::destroy(bus, destructor) {
            Ok(resources) => {
                *state = Phase::Idle(resources);
                Ok(())
            }
            Err((err, resources)) => {
                *state = Phase::Idle(resources);
                Err(BusError::FactoryError(err))
            }
        }
    }
}
