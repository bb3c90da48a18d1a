//! Application context
//!
//! Built once in [`App`](crate::App) and provided to every page. Pages read
//! the viewer from here instead of going back to browser storage.

use course_core::{EntitlementStore, PlayerConfig, ViewerContext};
use course_runtime::{BackendClient, BackendConfig, PaymentError};

/// Storage keys written by the auth layer
const TOKEN_KEY: &str = "token";
const ROLE_KEY: &str = "role";
const USER_ID_KEY: &str = "userId";

/// Shared, read-only state handed to the view layer
#[derive(Clone)]
pub struct AppContext {
    pub viewer: ViewerContext,
    pub entitlements: EntitlementStore,
    pub backend: BackendConfig,
    pub player: PlayerConfig,
}

impl AppContext {
    /// Snapshot browser state once at startup
    pub fn from_browser() -> Self {
        Self {
            viewer: load_viewer(),
            entitlements: EntitlementStore::new(),
            backend: BackendConfig::for_origin(&crate::api::origin()),
            player: PlayerConfig::default(),
        }
    }

    /// HTTP client carrying the viewer's credentials
    pub fn client(&self) -> Result<BackendClient, PaymentError> {
        Ok(BackendClient::from_config(self.backend.clone())?.with_context(&self.viewer))
    }
}

fn load_viewer() -> ViewerContext {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
    let Some(storage) = storage else {
        return ViewerContext::guest();
    };
    let read = |key: &str| storage.get_item(key).ok().flatten();

    ViewerContext::from_parts(read(TOKEN_KEY), read(ROLE_KEY).as_deref(), read(USER_ID_KEY))
}
