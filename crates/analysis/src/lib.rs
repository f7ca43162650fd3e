//! Derived vehicle-physics metrics over decoded frames.

mod alternates;
pub mod summary;
pub mod transformer;
pub mod units;

pub use summary::dashboard;
pub use transformer::{RevLight, Transformer, Transmission, Vmax};
