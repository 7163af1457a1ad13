// Domain layer: models and ports. Concrete collaborators live under adapters.

pub mod model;
pub mod ports;
