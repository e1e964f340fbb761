//! Access-group binding and the group-permission propagator.

pub mod binding;
pub mod propagator;

pub use binding::AccessGroupBinding;
pub use propagator::GroupPermissionPropagator;
