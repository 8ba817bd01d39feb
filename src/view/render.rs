use axum::response::Html;
use serde::Serialize;
use tower_sessions::Session;

use crate::module::WebModule;
use crate::session::{FlashMessages, SessionError, SessionPersistence};
use crate::view::{Templates, ViewData, ViewError};

/// Renders a template with the full page context of a web module: the
/// module's paths, the logged-in user, and any pending flash messages.
#[derive(Debug, Clone)]
pub struct LayoutView<S: SessionPersistence> {
    templates: Templates,
    template: String,
    module: WebModule<S>,
}

impl<S: SessionPersistence> LayoutView<S> {
    pub fn new(templates: Templates, template: impl Into<String>, module: WebModule<S>) -> Self {
        Self {
            templates,
            template: template.into(),
            module,
        }
    }

    /// Render for the request owning `session`.
    ///
    /// Flash messages are consumed whether or not the template shows them.
    /// Modules without user sessions render as anonymous.
    pub async fn render<T: Serialize>(
        &self,
        session: &Session,
        data: T,
    ) -> Result<Html<String>, ViewError> {
        let flash = FlashMessages::take(session).await?;

        let logged_in_user = match self.module.logged_in_user(session).await {
            Ok(user) => user,
            Err(SessionError::UserSessionNotInitialized) => None,
            Err(e) => return Err(e.into()),
        };

        let view = ViewData {
            context_path: self.module.base().context_path().to_string(),
            assets_path: self.module.assets_url(),
            views_path: self.module.views_path().to_string(),
            logged_in_user,
            ..ViewData::bare(data)
        }
        .with_flash(flash);

        Ok(Html(self.templates.render(&self.template, &view)?))
    }
}

/// Renders a template with no session context.
#[derive(Debug, Clone)]
pub struct SimpleView {
    templates: Templates,
    template: String,
}

impl SimpleView {
    pub fn new(templates: Templates, template: impl Into<String>) -> Self {
        Self {
            templates,
            template: template.into(),
        }
    }

    pub fn render<T: Serialize>(&self, data: T) -> Result<Html<String>, ViewError> {
        let view = ViewData::bare(data);
        Ok(Html(self.templates.render(&self.template, &view)?))
    }
}
