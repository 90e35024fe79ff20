//! # Module Server - API de haut niveau pour Axum
//!
//! Chaque device virtuel possède son propre [`Server`] : un router Axum lié à
//! `ip:port`. Le bind est fait dans [`Server::start`] afin que l'appelant
//! reçoive l'erreur et décide de son traitement.

use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serveur HTTP lié à une adresse précise
#[derive(Debug)]
pub struct Server {
    name: String,
    ip: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    shutdown: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `ip` - Adresse d'écoute (ex: "192.168.1.10")
    /// * `http_port` - Port HTTP à écouter, `0` pour un port éphémère
    pub fn new(name: impl Into<String>, ip: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            shutdown: CancellationToken::new(),
            join_handle: None,
        }
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        let mut r = self.router.write().await;

        *r = if path == "/" {
            std::mem::take(&mut *r).merge(sub_router)
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            std::mem::take(&mut *r).nest(&normalized, sub_router)
        };
    }

    /// Remplace le jeton d'arrêt du serveur
    ///
    /// Permet de partager un même jeton entre plusieurs serveurs.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Démarre le serveur HTTP
    ///
    /// Lie le socket TCP puis lance le service dans une tâche dédiée.
    ///
    /// # Errors
    ///
    /// Retourne l'erreur de bind (port déjà utilisé, adresse absente...).
    ///
    /// # Returns
    ///
    /// L'adresse effectivement liée.
    pub async fn start(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind((self.ip.as_str(), self.http_port)).await?;
        let local_addr = listener.local_addr()?;

        info!(
            "Server {} running at [http://{}](http://{})",
            self.name, local_addr, local_addr
        );

        let router = self.router.read().await.clone();
        let token = self.shutdown.clone();
        let name = self.name.clone();

        self.join_handle = Some(tokio::spawn(async move {
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            let result = axum::serve(listener, service)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;

            match result {
                Ok(()) => info!("Server {} stopped", name),
                Err(e) => warn!("❌ Server {} stopped with error: {}", name, e),
            }
        }));

        Ok(local_addr)
    }

    /// Demande l'arrêt gracieux du serveur
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    ip: String,
    http_port: u16,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>, ip: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            http_port,
        }
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        Server::new(self.name, self.ip, self.http_port)
    }
}
