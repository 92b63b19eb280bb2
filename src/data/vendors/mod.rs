//! One parser per instrument family.

pub(crate) mod biologic;
pub(crate) mod hz7000;
pub(crate) mod sd8;

pub use biologic::Biologic;
pub use hz7000::Hz7000;
pub use sd8::Sd8;
