pub mod application_service;
pub mod archival_service;
pub mod audit_service;
pub mod calendar_service;
pub mod ingestion_service;
pub mod notification_service;
pub mod object_store;
pub mod scheduling_service;
pub mod transition_engine;
