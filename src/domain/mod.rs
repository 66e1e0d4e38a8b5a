// Domain layer: the user records and the ports the workflow is wired through.

pub mod model;
pub mod ports;
