pub mod analyze;
pub mod fill;
pub mod status;
pub mod suggest;
