use super::auth::SessionKeys;
use crate::orm::Database;
use crate::web::{TemplateRenderer, WebState};
use std::path::PathBuf;
use std::sync::Arc;

/// Settings the blog handlers read at request time.
#[derive(Debug, Clone)]
pub struct Settings {
    pub session: SessionKeys,
    /// bcrypt cost for newly stored passwords.
    pub password_cost: u32,
    pub static_dir: PathBuf,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub templates: Arc<dyn TemplateRenderer>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: Database, templates: Arc<dyn TemplateRenderer>, settings: Settings) -> Self {
        Self {
            db,
            templates,
            settings: Arc::new(settings),
        }
    }
}

impl WebState for AppState {
    fn templates(&self) -> &dyn TemplateRenderer {
        self.templates.as_ref()
    }
}
