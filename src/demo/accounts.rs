//! Login pages backed by a fixed user directory.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form,
};
use serde::{Deserialize, Serialize};

use fx_server::config::ServerConfig;
use fx_server::module::WebModule;
use fx_server::session::{
    flash, ExtendableStore, FlashKind, LookupError, MemoryStore, Session, UserId, WebUser,
};
use fx_server::view::{LayoutView, Templates};

type Store = ExtendableStore<MemoryStore>;

struct Account {
    password: String,
    user: WebUser,
}

/// Users known to the demo, keyed by username.
#[derive(Clone, Default)]
pub struct Directory {
    accounts: Arc<HashMap<String, Account>>,
}

impl Directory {
    pub fn seeded() -> Self {
        let mut accounts = HashMap::new();
        for (id, username, full_name, password) in [
            ("1", "alice", "Alice Liddell", "wonderland"),
            ("2", "bob", "Bob Builder", "canwefixit"),
        ] {
            accounts.insert(
                username.to_string(),
                Account {
                    password: password.to_string(),
                    user: WebUser {
                        id: UserId::new(id),
                        full_name: full_name.to_string(),
                        username: username.to_string(),
                    },
                },
            );
        }
        Self {
            accounts: Arc::new(accounts),
        }
    }

    pub fn find(&self, id: UserId) -> Result<WebUser, LookupError> {
        self.accounts
            .values()
            .find(|account| account.user.id == id)
            .map(|account| account.user.clone())
            .ok_or(LookupError::NotFound(id))
    }

    fn authenticate(&self, username: &str, password: &str) -> Option<WebUser> {
        self.accounts
            .get(username)
            .filter(|account| account.password == password)
            .map(|account| account.user.clone())
    }
}

#[derive(Clone)]
struct Pages {
    module: WebModule<Store>,
    directory: Directory,
    home: LayoutView<Store>,
    login: LayoutView<Store>,
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct HomePage {
    title: &'static str,
}

pub fn module(store: Store, config: &ServerConfig, directory: Directory) -> WebModule<Store> {
    WebModule::new(
        store,
        config.session.clone(),
        config.web.clone(),
        move |module, router| {
            let templates = Templates::from_dir(module.views_path());
            let pages = Pages {
                module: module.clone(),
                directory: directory.clone(),
                home: module.layout(templates.clone(), "home.html"),
                login: module.layout(templates, "login.html"),
            };
            router
                .route("/", get(home).with_state(pages.clone()))
                .route(
                    "/login",
                    get(login_form).post(login).with_state(pages.clone()),
                )
                .route("/logout", post(logout).with_state(pages));
            Ok(())
        },
    )
}

async fn home(State(pages): State<Pages>, session: Session) -> Response {
    pages
        .home
        .render(&session, HomePage { title: "Home" })
        .await
        .into_response()
}

async fn login_form(State(pages): State<Pages>, session: Session) -> Response {
    pages
        .login
        .render(&session, HomePage { title: "Sign in" })
        .await
        .into_response()
}

async fn login(
    State(pages): State<Pages>,
    session: Session,
    Form(credentials): Form<Credentials>,
) -> Response {
    let base = pages.module.base();
    let Some(user) = pages
        .directory
        .authenticate(&credentials.username, &credentials.password)
    else {
        if let Err(e) = flash::set(&session, FlashKind::Error, "Unknown user or wrong password").await {
            return e.into_response();
        }
        return Redirect::to(&base.path("/login")).into_response();
    };

    let result = async {
        pages.module.start_user_session(&session, &user).await?;
        flash::set(&session, FlashKind::Success, format!("Welcome back, {}", user.full_name)).await
    }
    .await;

    match result {
        Ok(()) => Redirect::to(&base.path("/")).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn logout(State(pages): State<Pages>, session: Session) -> Response {
    let result = async {
        pages.module.end_user_session(&session).await?;
        flash::set(&session, FlashKind::Info, "You have been signed out").await
    }
    .await;

    match result {
        Ok(()) => Redirect::to(&pages.module.base().path("/")).into_response(),
        Err(e) => e.into_response(),
    }
}
