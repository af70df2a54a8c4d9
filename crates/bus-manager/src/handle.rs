use core::mem::ManuallyDrop;
use core::ops::Deref;

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::error::BusError;
use crate::factory::BusFactory;
use crate::manager::BusManager;

/// RAII handle providing shared access to the bus.
///
/// Each live handle counts as one user of the bus. Dropping the last handle
/// closes the bus through [`BusFactory::destroy`]; use [`BusHandle::close`]
/// instead of a plain drop when the close result matters.
///
/// A handle only crosses threads when the bus, its resources and its
/// destructor token are all `Send`:
///
/// ```compile_fail
/// use std::rc::Rc;
/// use bus_manager::{BusFactory, BusHandle};
/// use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
///
/// struct LocalFactory;
///
/// impl BusFactory for LocalFactory {
///     type Bus = u8;
///     type Resources = Rc<u8>;
///     type Destructor = Rc<u8>;
///     type Error = ();
///
///     fn create(r: Rc<u8>) -> Result<(u8, Rc<u8>), ((), Rc<u8>)> {
///         Ok((*r, r))
///     }
///
///     fn destroy(_: u8, d: Rc<u8>) -> Result<Rc<u8>, ((), Rc<u8>)> {
///         Ok(d)
///     }
/// }
///
/// fn assert_send<T: Send>() {}
/// assert_send::<BusHandle<'static, CriticalSectionRawMutex, LocalFactory>>();
/// ```
pub struct BusHandle<'a, M: RawMutex, F: BusFactory> {
    manager: &'a BusManager<M, F>,
    bus_ptr: *const F::Bus,
}

impl<M: RawMutex, F: BusFactory> Deref for BusHandle<'_, M, F> {
    type Target = F::Bus;

    #[inline]
    fn deref(&self) -> &F::Bus {
        // SAFETY: The handle is alive (caller has `&self`), so users > 0.
        // The manager only closes the bus when the user count reaches zero,
        // so the pointee is valid for the lifetime of `self`.
        unsafe { &*self.bus_ptr }
    }
}

impl<M: RawMutex, F: BusFactory> Drop for BusHandle<'_, M, F> {
    fn drop(&mut self) {
        if self.manager.release_one().is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("bus close failed after the last handle was dropped");
        }
    }
}

// SAFETY: A BusHandle is a shared reference to F::Bus plus a reference to the
// manager. Dropping the last handle moves the bus, destructor and resources
// through `F::destroy` on the dropping thread, so all of them must be Send.
unsafe impl<M: RawMutex + Sync, F: BusFactory> Send for BusHandle<'_, M, F>
where
    F::Bus: Send + Sync,
    F::Resources: Send,
    F::Destructor: Send,
{
}

// SAFETY: All access goes through Deref which yields &F::Bus, and the
// manager serialises its own state behind `M`. Close runs from `Drop`, which
// needs ownership, so the same bounds as `Send` apply.
unsafe impl<M: RawMutex + Sync, F: BusFactory> Sync for BusHandle<'_, M, F>
where
    F::Bus: Send + Sync,
    F::Resources: Send,
    F::Destructor: Send,
{
}

impl<'a, M: RawMutex, F: BusFactory> BusHandle<'a, M, F> {
    /// Create a new handle. Only called by `BusManager` after counting the user.
    pub(crate) fn new(
        manager: &'a BusManager<M, F>,
        bus_ptr: *const F::Bus,
    ) -> Self {
        Self { manager, bus_ptr }
    }

    /// Returns a reference to the underlying bus.
    #[inline]
    pub fn bus(&self) -> &F::Bus {
        self
    }

    /// Release this handle and report the outcome of closing the bus.
    ///
    /// Returns `Ok(())` when other handles keep the bus open. When this was
    /// the last handle, the bus is closed and a platform close failure comes
    /// back as [`BusError::FactoryError`].
    pub fn close(self) -> Result<(), BusError<F::Error>> {
        let this = ManuallyDrop::new(self);
        this.manager.release_one()
    }
}
