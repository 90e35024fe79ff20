//! # Module Devices - Prises virtuelles
//!
//! Un [`VirtualDevice`] possède une identité immuable et un endpoint HTTP lié
//! à son port. Il répond aussi, en unicast, aux recherches SSDP que lui
//! transmet le listener.
//!
//! ## Routes HTTP
//!
//! | Chemin | Effet |
//! |--------|-------|
//! | `/settings.xml` | Description XML + événement `protocol.settings` |
//! | `/upnp/control/basicevent1` | Décodage `SetBinaryState` + événement `device.event` |
//! | autre | Trace `unknown request url` |

mod device;
mod errors;
mod identity;

pub use device::{DeviceState, VirtualDevice};
pub use errors::DeviceError;
pub use identity::DeviceIdentity;
