//! Session bootstrap.
//!
//! Maps gateway lifecycle events onto the view a front end should show:
//! a loading screen while the session negotiates, the application once it is
//! ready, and the login page when there is no session to resume.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::error::ClientError;
use crate::gateway::{DisconnectSubscription, GatewayHandle, ReadySubscription};
use crate::token::TokenStore;

/// What the front end should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Send the user to the login page, returning to the current path afterwards.
    RedirectToLogin {
        /// Login location including the `redirect_to` query.
        location: String,
    },
    /// Waiting for the session to become ready.
    Loading,
    /// Session is ready.
    Connected,
}

/// Login location that returns to `path` after signing in.
#[must_use]
pub fn login_redirect(path: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/?redirect_to={encoded}")
}

/// A mounted bootstrap. Unmounts on drop.
#[derive(Debug)]
pub struct Bootstrap {
    gateway: GatewayHandle,
    view: Arc<watch::Sender<View>>,
    ready: Option<ReadySubscription>,
    disconnect: Option<DisconnectSubscription>,
}

impl Bootstrap {
    /// Mount against `gateway`, for a user currently at `path`.
    ///
    /// Without a stored token the view is a login redirect and the gateway is
    /// left alone. Otherwise lifecycle handlers are registered and the gateway
    /// is started.
    pub async fn mount(
        gateway: GatewayHandle,
        tokens: &dyn TokenStore,
        path: &str,
    ) -> Result<Self, ClientError> {
        let location = login_redirect(path);

        if tokens.get().is_none() {
            info!(%location, "no session token, redirecting to login");
            let (view, _) = watch::channel(View::RedirectToLogin { location });
            return Ok(Self {
                gateway,
                view: Arc::new(view),
                ready: None,
                disconnect: None,
            });
        }

        let (view, _) = watch::channel(View::Loading);
        let view = Arc::new(view);

        let on_disconnect = Arc::clone(&view);
        let disconnect = gateway
            .add_disconnect_handler(move |reconnect| {
                let next = if reconnect {
                    View::Loading
                } else {
                    View::RedirectToLogin {
                        location: location.clone(),
                    }
                };
                debug!(reconnect, "gateway disconnected");
                on_disconnect.send_replace(next);
            })
            .await?;

        let on_ready = Arc::clone(&view);
        let ready = gateway
            .add_ready_handler(move || {
                on_ready.send_replace(View::Connected);
            })
            .await?;

        let bootstrap = Self {
            gateway,
            view,
            ready: Some(ready),
            disconnect: Some(disconnect),
        };
        bootstrap.gateway.start()?;
        Ok(bootstrap)
    }

    /// Current view.
    #[must_use]
    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    /// Watch view changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }

    /// Remove the lifecycle handlers. No view change happens afterwards.
    pub fn unmount(self) {
        drop(self);
    }

    fn detach(&mut self) {
        if let Some(ready) = self.ready.take() {
            self.gateway.remove_ready_handler(ready);
        }
        if let Some(disconnect) = self.disconnect.take() {
            self.gateway.remove_disconnect_handler(disconnect);
        }
    }
}

impl Drop for Bootstrap {
    fn drop(&mut self) {
        self.detach();
    }
}
