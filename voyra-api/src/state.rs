use std::sync::Arc;
use voyra_booking::{CatalogRepository, ScheduleStore, TemplateRepository};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub schedule: Arc<dyn ScheduleStore>,
}
