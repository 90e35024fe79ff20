//! Décodage de l'action `SetBinaryState`.

use super::ControlError;
use std::io::BufReader;
use xmltree::Element;

/// Commande de commutation issue d'un `SetBinaryState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
}

impl SwitchCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchCommand::On => "ON",
            SwitchCommand::Off => "OFF",
        }
    }
}

impl std::fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corps décodé d'une requête `basicevent1`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicEvent {
    binary_state: Option<i64>,
}

impl BasicEvent {
    pub fn new(binary_state: Option<i64>) -> Self {
        Self { binary_state }
    }

    /// Valeur de `BinaryState`, absente si l'élément manque ou est vide
    pub fn binary_state(&self) -> Option<i64> {
        self.binary_state
    }

    /// `1` donne ON, `0` donne OFF, toute autre valeur est ignorée
    pub fn command(&self) -> Option<SwitchCommand> {
        match self.binary_state {
            Some(1) => Some(SwitchCommand::On),
            Some(0) => Some(SwitchCommand::Off),
            _ => None,
        }
    }
}

/// Décode `Envelope/Body/SetBinaryState/BinaryState`
///
/// # Errors
///
/// XML invalide, racine autre que `Envelope`, ou `BinaryState` non entier.
pub fn decode_basic_event(body: &[u8]) -> Result<BasicEvent, ControlError> {
    let root = Element::parse(BufReader::new(body))?;

    if root.name != "Envelope" {
        return Err(ControlError::NotAnEnvelope(root.name));
    }

    let text = root
        .get_child("Body")
        .and_then(|b| b.get_child("SetBinaryState"))
        .and_then(|a| a.get_child("BinaryState"))
        .and_then(|s| s.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let binary_state = match text {
        Some(value) => Some(
            value
                .parse::<i64>()
                .map_err(|source| ControlError::InvalidBinaryState { value, source })?,
        ),
        None => None,
    };

    Ok(BasicEvent { binary_state })
}
