use std::collections::BTreeSet;
use std::sync::Arc;

use admindeck_core::{AppError, AppResult, StorageKey, UserIdentity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::field_renderer::OptionsResolver;
use crate::ports::{FileUploader, LocalStore, RecordBackend, read_best_effort, write_best_effort};

const MENU_FEATURE: &str = "menu";
const MENU_ID: &str = "state";

/// Collaborators shared by every page of the application.
#[derive(Clone)]
pub struct AppPorts {
    /// REST backend.
    pub backend: Arc<dyn RecordBackend>,
    /// Upload endpoint, when the deployment has one.
    pub uploader: Option<Arc<dyn FileUploader>>,
    /// Best-effort key/value store.
    pub store: Arc<dyn LocalStore>,
}

/// Navigation menu state persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuState {
    /// Menu collapsed to icons.
    pub collapsed: bool,
    /// Highlighted menu entry.
    pub active_item: Option<String>,
}

/// Session, menu, and dismissal state with an explicit lifecycle.
///
/// Constructed once, initialised on sign-in, torn down on sign-out, and
/// passed by reference to the pages that need it.
pub struct AppContext {
    ports: AppPorts,
    namespace: String,
    session: Option<UserIdentity>,
    menu: MenuState,
    dismissed: BTreeSet<String>,
}

impl AppContext {
    /// Creates an uninitialised context. `namespace` prefixes every storage key.
    pub fn new(ports: AppPorts, namespace: impl Into<String>) -> AppResult<Self> {
        let namespace = namespace.into();
        StorageKey::new(namespace.as_str(), MENU_FEATURE, MENU_ID).map_err(|error| {
            AppError::Configuration(format!("invalid storage namespace: {}", error.message()))
        })?;

        Ok(Self {
            ports,
            namespace,
            session: None,
            menu: MenuState::default(),
            dismissed: BTreeSet::new(),
        })
    }

    /// Starts a session and restores the persisted menu state.
    pub async fn init(&mut self, session: UserIdentity) -> AppResult<()> {
        if self.session.is_some() {
            return Err(AppError::InvalidState(
                "application context is already initialised".to_owned(),
            ));
        }

        let key = self.menu_key()?;
        self.menu = read_best_effort(self.ports.store.as_ref(), &key)
            .await
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();

        info!(subject = %session.subject(), "session started");
        self.session = Some(session);
        Ok(())
    }

    /// Persists the menu state and ends the session.
    pub async fn teardown(&mut self) -> AppResult<()> {
        let Some(session) = self.session.take() else {
            return Err(AppError::InvalidState(
                "application context is not initialised".to_owned(),
            ));
        };

        self.persist_menu().await?;
        self.menu = MenuState::default();
        self.dismissed.clear();
        info!(subject = %session.subject(), "session ended");
        Ok(())
    }

    /// Returns whether a session is active.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the signed-in user.
    pub fn session(&self) -> AppResult<&UserIdentity> {
        self.session
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("no active session".to_owned()))
    }

    /// Returns the storage namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Returns the shared collaborators.
    #[must_use]
    pub fn ports(&self) -> &AppPorts {
        &self.ports
    }

    /// Returns the menu state.
    #[must_use]
    pub fn menu(&self) -> &MenuState {
        &self.menu
    }

    /// Collapses or expands the menu.
    pub async fn toggle_menu(&mut self) -> AppResult<bool> {
        self.session()?;
        self.menu.collapsed = !self.menu.collapsed;
        self.persist_menu().await?;
        Ok(self.menu.collapsed)
    }

    /// Highlights a menu entry.
    pub async fn select_menu_item(&mut self, item: &str) -> AppResult<()> {
        self.session()?;
        let item = item.trim();
        if item.is_empty() {
            return Err(AppError::Validation("menu item must not be empty".to_owned()));
        }
        self.menu.active_item = Some(item.to_owned());
        self.persist_menu().await
    }

    /// Builds a key under this context's namespace.
    pub fn storage_key(&self, feature: &str, id: &str) -> AppResult<StorageKey> {
        StorageKey::new(self.namespace.as_str(), feature, id)
    }

    /// Hides a dismissible element (banner, tip) for good.
    pub async fn dismiss(&mut self, feature: &str, id: &str) -> AppResult<()> {
        let key = self.storage_key(feature, id)?;
        write_best_effort(self.ports.store.as_ref(), &key, serde_json::Value::Bool(true)).await;
        debug!(key = %key, "element dismissed");
        self.dismissed.insert(key.to_string());
        Ok(())
    }

    /// Returns whether an element was dismissed in this or an earlier session.
    pub async fn is_dismissed(&self, feature: &str, id: &str) -> AppResult<bool> {
        let key = self.storage_key(feature, id)?;
        if self.dismissed.contains(&key.to_string()) {
            return Ok(true);
        }

        Ok(read_best_effort(self.ports.store.as_ref(), &key)
            .await
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    /// Options resolver caching lookups under this context's namespace.
    #[must_use]
    pub fn options_resolver(&self) -> OptionsResolver {
        OptionsResolver::new(Arc::clone(&self.ports.backend))
            .with_cache(Arc::clone(&self.ports.store), self.namespace.as_str())
    }

    fn menu_key(&self) -> AppResult<StorageKey> {
        self.storage_key(MENU_FEATURE, MENU_ID)
    }

    async fn persist_menu(&self) -> AppResult<()> {
        let key = self.menu_key()?;
        let encoded = serde_json::to_value(&self.menu)
            .map_err(|error| AppError::Internal(format!("failed to encode menu state: {error}")))?;
        write_best_effort(self.ports.store.as_ref(), &key, encoded).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use admindeck_core::{AppError, UserIdentity};
    use serde_json::json;

    use super::{AppContext, AppPorts, MenuState};
    use crate::test_support::{FakeBackend, FakeStore};

    fn operator() -> UserIdentity {
        UserIdentity::new("auth0|42")
            .unwrap_or_else(|_| unreachable!())
            .with_display_name("Dana")
            .with_email("dana@example.com")
    }

    fn context_with(store: Arc<FakeStore>) -> AppContext {
        AppContext::new(
            AppPorts {
                backend: Arc::new(FakeBackend::new()),
                uploader: None,
                store,
            },
            "admindeck",
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn namespace_with_separator_is_rejected() {
        let result = AppContext::new(
            AppPorts {
                backend: Arc::new(FakeBackend::new()),
                uploader: None,
                store: Arc::new(FakeStore::default()),
            },
            "admin:deck",
        );

        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn init_restores_menu_and_teardown_persists_it() {
        let store = Arc::new(FakeStore::default());
        store.entries.lock().await.insert(
            "admindeck:menu:state".to_owned(),
            json!({"collapsed": true, "activeItem": "tickets"}),
        );
        let mut context = context_with(store.clone());

        context
            .init(operator())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            context.menu(),
            &MenuState {
                collapsed: true,
                active_item: Some("tickets".to_owned()),
            }
        );
        assert_eq!(
            context.session().map(UserIdentity::subject).ok(),
            Some("auth0|42")
        );

        context
            .select_menu_item("attendees")
            .await
            .unwrap_or_else(|_| unreachable!());
        context.teardown().await.unwrap_or_else(|_| unreachable!());

        assert!(!context.is_initialized());
        assert_eq!(context.menu(), &MenuState::default());
        assert_eq!(
            store.entries.lock().await.get("admindeck:menu:state"),
            Some(&json!({"collapsed": true, "activeItem": "attendees"}))
        );
    }

    #[tokio::test]
    async fn lifecycle_transitions_are_checked() {
        let mut context = context_with(Arc::new(FakeStore::default()));

        assert!(matches!(context.session(), Err(AppError::InvalidState(_))));
        assert!(matches!(
            context.teardown().await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            context.toggle_menu().await,
            Err(AppError::InvalidState(_))
        ));

        context
            .init(operator())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            context.init(operator()).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn dismissals_survive_a_new_context() {
        let store = Arc::new(FakeStore::default());
        let mut first = context_with(store.clone());
        first
            .dismiss("banner", "welcome")
            .await
            .unwrap_or_else(|_| unreachable!());

        let second = context_with(store);

        assert!(
            second
                .is_dismissed("banner", "welcome")
                .await
                .unwrap_or_else(|_| unreachable!())
        );
        assert!(
            !second
                .is_dismissed("banner", "pricing")
                .await
                .unwrap_or_else(|_| unreachable!())
        );
    }

    #[tokio::test]
    async fn broken_store_never_fails_the_session() {
        let store = Arc::new(FakeStore {
            broken: true,
            ..FakeStore::default()
        });
        let mut context = context_with(store);

        context
            .init(operator())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(context.menu(), &MenuState::default());

        assert!(context.toggle_menu().await.unwrap_or_else(|_| unreachable!()));
        context
            .dismiss("banner", "welcome")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(
            context
                .is_dismissed("banner", "welcome")
                .await
                .unwrap_or_else(|_| unreachable!())
        );
        context.teardown().await.unwrap_or_else(|_| unreachable!());
    }
}
