// Domain layer: shared result types and ports (interfaces) between the pipelines.

pub mod model;
pub mod ports;
