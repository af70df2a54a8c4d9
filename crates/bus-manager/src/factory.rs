/// Abstracts bus creation and destruction.
///
/// Implementors define how to open a bus from resources and how to close it
/// again, handing the resources back so the bus can be reopened later.
pub trait BusFactory {
    /// The bus type that will be shared among handles.
    type Bus;
    /// Resources needed to create the bus (e.g. a device node path).
    type Resources;
    /// Opaque token that can reconstruct [`Resources`](Self::Resources) after the bus is closed.
    type Destructor;
    /// Error type for open and close failures.
    type Error: core::fmt::Debug;

    /// Open the bus from the given resources.
    ///
    /// On success, returns the bus instance and a destructor token.
    /// On failure, returns the error **and** the original resources so they are not lost.
    fn create(
        resources: Self::Resources,
    ) -> Result<(Self::Bus, Self::Destructor), (Self::Error, Self::Resources)>;

    /// Close the bus and recover the original resources.
    ///
    /// A failed close still hands the resources back alongside the error.
    fn destroy(
        bus: Self::Bus,
        destructor: Self::Destructor,
    ) -> Result<Self::Resources, (Self::Error, Self::Resources)>;
}
