pub mod import_batch;
pub mod odometer;
pub mod submission;
pub mod vehicle;

pub use import_batch::*;
pub use odometer::*;
pub use submission::*;
pub use vehicle::*;
