//! Gateway traits (ports)

pub mod matrix_gateway;

pub use matrix_gateway::MatrixGateway;

#[cfg(test)]
pub use matrix_gateway::MockMatrixGateway;
