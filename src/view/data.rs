use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::{FlashMessages, WebUser};

/// Context handed to every rendered template.
#[derive(Debug, Clone, Serialize)]
pub struct ViewData<T: Serialize> {
    /// Mount prefix of the rendering module.
    pub context_path: String,
    /// URL the module's assets are served under.
    pub assets_path: String,
    /// Directory the module loads views from.
    pub views_path: String,
    pub logged_in_user: Option<WebUser>,
    pub system_date: DateTime<Utc>,
    pub page_info_message: String,
    pub page_success_message: String,
    pub page_warning_message: String,
    pub page_error_message: String,
    pub data: T,
}

impl<T: Serialize> ViewData<T> {
    /// Context with only the clock and the caller's data filled in.
    pub fn bare(data: T) -> Self {
        Self {
            context_path: String::new(),
            assets_path: String::new(),
            views_path: String::new(),
            logged_in_user: None,
            system_date: Utc::now(),
            page_info_message: String::new(),
            page_success_message: String::new(),
            page_warning_message: String::new(),
            page_error_message: String::new(),
            data,
        }
    }

    pub fn with_flash(mut self, flash: FlashMessages) -> Self {
        self.page_info_message = flash.info;
        self.page_success_message = flash.success;
        self.page_warning_message = flash.warning;
        self.page_error_message = flash.error;
        self
    }
}
