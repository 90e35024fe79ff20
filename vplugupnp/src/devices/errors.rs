//! Erreurs relatives aux devices virtuels.

use std::net::SocketAddr;
use thiserror::Error;

/// Erreurs d'un device virtuel.
///
/// Elles sont aussi signalées sous forme d'événement `error.device` et ne
/// remontent jamais au-delà de l'orchestrateur.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Port de contrôle indisponible
    #[error("Cannot bind control port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Adresse du demandeur SSDP illisible
    #[error("Invalid requester address '{requester}': {source}")]
    InvalidRequester {
        requester: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Échec d'envoi de la réponse de découverte
    #[error("Cannot send discovery response to {addr}: {source}")]
    DiscoveryResponse {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
