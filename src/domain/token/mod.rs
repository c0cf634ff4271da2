pub mod enricher;
pub mod risk;
