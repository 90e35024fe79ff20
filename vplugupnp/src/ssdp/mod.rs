//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Ce module implémente la partie découverte des prises virtuelles :
//! réception des M-SEARCH en multicast, filtrage sur la cible Belkin et
//! construction des réponses unicast.
//!
//! ## Architecture
//!
//! - [`DiscoveryRequest`] : Requête M-SEARCH décodée (parsing total, jamais en erreur)
//! - [`DiscoveryResponseParams`] / [`build_discovery_response`] : Réponse unicast
//! - [`DiscoveryListener`] : Boucle de réception sur le socket multicast
//!
//! ## Constants SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 86400 secondes (émis, jamais appliqué)
//! - **Search Target**: `urn:Belkin:device:**`

mod listener;
mod request;
mod response;

use std::net::Ipv4Addr;

pub use listener::{DEFAULT_ERROR_BACKOFF, DiscoveryListener, bind_multicast};
pub use request::DiscoveryRequest;
pub use response::{DiscoveryResponseParams, build_discovery_response, http_date};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Durée de validité annoncée dans les réponses (en secondes)
pub const MAX_AGE: u32 = 86400;

/// Cible de recherche à laquelle les prises répondent
pub const BELKIN_SEARCH_TARGET: &str = "urn:Belkin:device:**";

/// Taille du buffer de réception d'un paquet
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Erreurs d'ouverture du socket de découverte
#[derive(Debug, thiserror::Error)]
pub enum SsdpError {
    #[error("Cannot bind SSDP socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot join multicast group {group} on interface {interface}: {source}")]
    JoinMulticast {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        #[source]
        source: std::io::Error,
    },
}
