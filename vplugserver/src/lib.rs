//! # vplugserver - Serveur HTTP par port basé sur Axum
//!
//! Cette crate fournit l'abstraction utilisée par chaque device virtuel pour
//! exposer son endpoint de contrôle : un serveur Axum lié à une adresse et un
//! port précis, démarré dans sa propre tâche, arrêtable via un
//! [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ## Architecture
//!
//! - [`server`] : Serveur HTTP et son builder
//! - [`logs`] : Initialisation du système de tracing
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use vplugserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut server = ServerBuilder::new("Kitchen", "192.168.1.10", 11000).build();
//!     server
//!         .add_router("/", Router::new().route("/ping", get(|| async { "pong" })))
//!         .await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LoggingOptions, init_logging};
pub use server::{Server, ServerBuilder};
