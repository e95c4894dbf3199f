pub mod analysis_dto;
pub mod application_dto;
pub mod archive_dto;
pub mod booking_dto;
pub mod notification_dto;
pub mod schedule_dto;
