// Domain layer: blood-group model, record shapes and the operation port.

pub mod blood_group;
pub mod model;
pub mod ports;
