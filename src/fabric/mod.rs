//! The notification fabric.
//!
//! [`Listeners`] is the public surface; [`Registry`] underneath owns one
//! `Group` of subscribers per call queue and one `Proxy` per coalesced
//! notification kind, ordered by the publisher's tick clock.

mod call;
mod group;
mod listeners;
mod proxy;
mod registry;

pub use call::Call;
pub use listeners::Listeners;
pub use registry::Registry;
