//! Session persistence contract and its user extension point.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tower_sessions::{
    session::{Id, Record},
    session_store, MemoryStore, SessionStore,
};

use crate::session::user::UserResolver;

/// Slot holding the application's user-resolution callback.
///
/// Cloned handles share the slot, so installing a resolver through any clone
/// of a store makes it visible to every module holding that store.
#[derive(Clone, Default)]
pub struct UserExtension {
    resolver: Arc<ArcSwapOption<UserResolver>>,
}

impl UserExtension {
    /// Install (or replace) the resolver.
    pub fn install(&self, resolver: UserResolver) {
        self.resolver.store(Some(Arc::new(resolver)));
    }

    pub fn resolver(&self) -> Option<Arc<UserResolver>> {
        self.resolver.load_full()
    }
}

impl fmt::Debug for UserExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserExtension")
            .field("installed", &self.resolver.load().is_some())
            .finish()
    }
}

/// A session store usable by web modules.
///
/// Stores that can resolve bound user identifiers expose a
/// [`UserExtension`]; plain stores still support anonymous sessions and flash
/// messages but cannot host logins.
pub trait SessionPersistence: SessionStore + Clone {
    fn user_extension(&self) -> Option<&UserExtension> {
        None
    }
}

impl SessionPersistence for MemoryStore {}

/// Wraps any store and adds the user extension point.
#[derive(Debug, Clone)]
pub struct ExtendableStore<S> {
    inner: S,
    users: UserExtension,
}

impl<S> ExtendableStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            users: UserExtension::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Default> Default for ExtendableStore<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[async_trait]
impl<S: SessionStore + Clone> SessionStore for ExtendableStore<S> {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.inner.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.inner.save(record).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        self.inner.load(session_id).await
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.inner.delete(session_id).await
    }
}

impl<S: SessionStore + Clone> SessionPersistence for ExtendableStore<S> {
    fn user_extension(&self) -> Option<&UserExtension> {
        Some(&self.users)
    }
}
