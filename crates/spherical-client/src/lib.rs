//! # spherical-client
//!
//! Client side of the Spherical gateway.
//!
//! A [`GatewayConnection`] keeps one session with a node's gateway alive,
//! retrying after failures and fanning lifecycle changes out to registered
//! handlers. [`GatewayHandle`] runs it on its own task; [`Bootstrap`] turns
//! its lifecycle into the view a front end should show.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spherical_client::{Bootstrap, ClientConfig, FileTokenStore, GatewayConnection, GatewayHandle, WsConnector};
//!
//! # async fn run() -> Result<(), spherical_client::ClientError> {
//! let config = ClientConfig::new("https://spherical.example.com");
//! let tokens = Arc::new(FileTokenStore::new(FileTokenStore::default_path()?));
//! let connector = WsConnector::new(config.gateway_url()?);
//! let (connection, events) = GatewayConnection::new(connector, tokens.clone(), config.gateway_options());
//! let gateway = GatewayHandle::spawn(connection, events);
//!
//! let bootstrap = Bootstrap::mount(gateway.clone(), tokens.as_ref(), "/").await?;
//! println!("{:?}", bootstrap.view());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod token;

pub use bootstrap::{login_redirect, Bootstrap, View};
pub use config::ClientConfig;
pub use error::ClientError;
pub use gateway::{
    ConnectionState, GatewayConnection, GatewayHandle, GatewayOptions, WsConnector,
};
pub use registry::{CallbackHandle, CallbackRegistry};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
