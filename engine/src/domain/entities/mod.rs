mod unit;

pub use unit::{LogConfig, ProcessSpec, SpecBuilder, Unit};
