//! Session-aware web modules.
//!
//! A `WebModule` owns a session store and manages the per-request user
//! session state machine:
//!
//! ```text
//! Anonymous ──start_user_session──▶ Authenticated
//!     ▲                                   │
//!     └─────────end_user_session──────────┘
//! ```
//!
//! Only the user identifier is bound into the session. The full user record is
//! resolved on demand through the callback installed by
//! `initialize_user_session`, so a deleted or renamed user is never served
//! from a stale copy.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tower_http::services::ServeDir;
use tower_sessions::Session;

use crate::config::{SessionConfig, WebConfig};
use crate::error::BoxError;
use crate::module::{Module, ModuleBase, ModuleLogging, ModuleRouter};
use crate::observability::SharedLogger;
use crate::session::{
    session_layer, value, LookupError, PersistenceError, SessionError, SessionPersistence,
    SessionValue, UserId, UserResolver, WebUser,
};
use crate::view::{LayoutView, Templates};

/// Session key holding the authenticated user's identifier.
pub const USER_SESSION_KEY: &str = "fx:user:id";

/// Route declarations for a `WebModule`, run during `initialize`.
pub type WebRoutes<S> =
    Arc<dyn Fn(&WebModule<S>, &mut ModuleRouter) -> Result<(), BoxError> + Send + Sync>;

/// Authentication state of a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

pub struct WebModule<S: SessionPersistence> {
    base: ModuleBase,
    store: S,
    session: SessionConfig,
    web: WebConfig,
    routes: WebRoutes<S>,
}

impl<S: SessionPersistence> WebModule<S> {
    pub fn new<F>(store: S, session: SessionConfig, web: WebConfig, routes: F) -> Self
    where
        F: Fn(&WebModule<S>, &mut ModuleRouter) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            base: ModuleBase::default(),
            store,
            session,
            web,
            routes: Arc::new(routes),
        }
    }

    pub fn base(&self) -> &ModuleBase {
        &self.base
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Filesystem directory holding the module's templates.
    pub fn views_path(&self) -> &str {
        &self.web.views_path
    }

    /// Filesystem directory served under `<context path>/assets`.
    pub fn assets_path(&self) -> &str {
        &self.web.assets_path
    }

    /// URL under which the assets directory is served.
    pub fn assets_url(&self) -> String {
        self.base.path("assets")
    }

    /// A layout view over `templates` bound to this module.
    pub fn layout(&self, templates: Templates, template: impl Into<String>) -> LayoutView<S> {
        LayoutView::new(templates, template, self.clone())
    }

    /// Install the callback that turns a bound identifier back into a user.
    ///
    /// Must run before any user-session operation. Calling it again replaces
    /// the previous callback for every clone of the module.
    pub fn initialize_user_session<F, Fut>(&self, lookup: F) -> Result<(), PersistenceError>
    where
        F: Fn(UserId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WebUser, LookupError>> + Send + 'static,
    {
        let extension = self
            .store
            .user_extension()
            .ok_or(PersistenceError::Unsupported {
                store: std::any::type_name::<S>(),
            })?;
        extension.install(UserResolver::new(lookup));
        Ok(())
    }

    /// Log `user` in: rotate the session identifier, then bind the user id.
    pub async fn start_user_session(
        &self,
        session: &Session,
        user: &WebUser,
    ) -> Result<(), SessionError> {
        self.resolver()?;

        session.cycle_id().await?;
        session.insert(USER_SESSION_KEY, &user.id).await?;

        if let Some(logger) = self.base.logger() {
            logger.debug(&format_args!("user {} started a session", user.id));
        }
        Ok(())
    }

    /// Log out: remove the binding, rotate the identifier, then destroy the
    /// session. Anonymous sessions are left untouched.
    pub async fn end_user_session(&self, session: &Session) -> Result<(), SessionError> {
        self.resolver()?;

        let bound: SessionValue<UserId> = value::read(session, USER_SESSION_KEY).await?;
        if bound.is_absent() {
            return Ok(());
        }

        session
            .remove::<serde_json::Value>(USER_SESSION_KEY)
            .await?;
        session.cycle_id().await?;
        session.flush().await?;

        if let Some(logger) = self.base.logger() {
            logger.debug(&"user session ended");
        }
        Ok(())
    }

    /// The user bound to `session`, resolved through the installed callback.
    ///
    /// A user the callback no longer knows reads as anonymous; any other
    /// callback failure is reported.
    pub async fn logged_in_user(&self, session: &Session) -> Result<Option<WebUser>, SessionError> {
        let resolver = self.resolver()?;

        match value::read::<UserId>(session, USER_SESSION_KEY).await? {
            SessionValue::Absent => Ok(None),
            SessionValue::WrongShape(raw) => Err(SessionError::InvalidUserBinding(raw.to_string())),
            SessionValue::Present(id) => match resolver.resolve(id).await {
                Ok(user) => Ok(Some(user)),
                Err(LookupError::NotFound(id)) => {
                    tracing::debug!(user = %id, "Bound user no longer exists");
                    Ok(None)
                }
                Err(e) => Err(SessionError::UserLookup(e)),
            },
        }
    }

    pub async fn auth_state(&self, session: &Session) -> Result<AuthState, SessionError> {
        Ok(match self.logged_in_user(session).await? {
            Some(_) => AuthState::Authenticated,
            None => AuthState::Anonymous,
        })
    }

    fn resolver(&self) -> Result<Arc<UserResolver>, SessionError> {
        self.store
            .user_extension()
            .and_then(|extension| extension.resolver())
            .ok_or(SessionError::UserSessionNotInitialized)
    }
}

impl<S: SessionPersistence> Clone for WebModule<S> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            store: self.store.clone(),
            session: self.session.clone(),
            web: self.web.clone(),
            routes: Arc::clone(&self.routes),
        }
    }
}

impl<S: SessionPersistence> std::fmt::Debug for WebModule<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebModule")
            .field("base", &self.base)
            .field("store", &self.store)
            .field("views_path", &self.web.views_path)
            .field("assets_path", &self.web.assets_path)
            .finish()
    }
}

impl<S: SessionPersistence> Module for WebModule<S> {
    fn set_context_path(&mut self, context_path: &str) {
        self.base.set_context_path(context_path);
    }

    fn context_path(&self) -> &str {
        self.base.context_path()
    }

    /// Declare the application routes, serve the assets directory when it
    /// exists, then wrap the whole scope in the session middleware.
    fn initialize(&mut self, router: &mut ModuleRouter) -> Result<(), BoxError> {
        let routes = Arc::clone(&self.routes);
        routes(self, router)?;

        if Path::new(&self.web.assets_path).is_dir() {
            router.nest_service("/assets", ServeDir::new(&self.web.assets_path));
        } else {
            tracing::debug!(
                path = %self.web.assets_path,
                "Assets directory not found, skipping static files"
            );
        }

        router.layer(session_layer(self.store.clone(), &self.session));
        Ok(())
    }

    fn logging(&mut self) -> Option<&mut dyn ModuleLogging> {
        Some(self)
    }
}

impl<S: SessionPersistence> ModuleLogging for WebModule<S> {
    fn set_logger(&mut self, logger: SharedLogger) {
        self.base.set_logger(logger);
    }

    fn logger(&self) -> Option<&SharedLogger> {
        self.base.logger()
    }
}
