mod registry;

pub use registry::UseCaseRegistry;
