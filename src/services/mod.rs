pub mod audit_log;
pub mod batch_ingestor;
pub mod hash_chain;
pub mod lookup_service;
pub mod odometer_tracker;
pub mod report_details;
pub mod submission_service;
pub mod templates;
pub mod vehicle_registry;
pub mod vin_decoder;

pub use batch_ingestor::BatchIngestor;
pub use lookup_service::LookupService;
pub use submission_service::SubmissionService;
pub use vehicle_registry::VehicleRegistry;
pub use vin_decoder::{NhtsaVinDecoder, VinDecoder};
