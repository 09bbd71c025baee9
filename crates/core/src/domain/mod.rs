pub mod contract;
pub mod equity;
pub mod recommendation;
