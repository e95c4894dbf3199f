pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::services::{
    application_service::ApplicationService, archival_service::ArchivalService,
    audit_service::AuditService, calendar_service::CalendarService,
    ingestion_service::IngestionService, notification_service::NotificationService,
    object_store::ObjectStore, scheduling_service::SchedulingService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub application_service: ApplicationService,
    pub ingestion_service: IngestionService,
    pub scheduling_service: SchedulingService,
    pub archival_service: ArchivalService,
    pub calendar_service: CalendarService,
    pub notification_service: NotificationService,
    pub audit_service: AuditService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, object_store: Arc<dyn ObjectStore>) -> Self {
        let application_service = ApplicationService::new(pool.clone());
        let ingestion_service = IngestionService::new(pool.clone());
        let calendar_service = CalendarService::new(
            pool.clone(),
            config.calendar_namespace.clone(),
            config.scheduling_lock_timeout,
        );
        let notification_service = NotificationService::from_config(pool.clone(), config);
        let scheduling_service = SchedulingService::new(
            pool.clone(),
            application_service.clone(),
            calendar_service.clone(),
            notification_service.clone(),
            config.enqueue_timeout,
        );
        let archival_service = ArchivalService::new(pool.clone(), object_store);
        let audit_service = AuditService::new(pool.clone());

        Self {
            pool,
            application_service,
            ingestion_service,
            scheduling_service,
            archival_service,
            calendar_service,
            notification_service,
            audit_service,
        }
    }
}
