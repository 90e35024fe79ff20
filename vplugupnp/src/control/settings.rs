//! Description du device servie sur `/settings.xml`.

use super::{ControlError, DEVICE_TYPE, MANUFACTURER, MODEL_NAME, MODEL_NUMBER, UDN_PREFIX};
use serde::Serialize;
use std::io::Write;
use xmltree::{Element, EmitterConfig, XMLNode};

/// Contenu de l'élément `<device>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDevice {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub model_number: String,
    #[serde(rename = "UDN")]
    pub udn: String,
}

/// Document `settings.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub device: SettingsDevice,
}

impl Settings {
    pub fn new(friendly_name: impl Into<String>, short_id: &str) -> Self {
        Self {
            device: SettingsDevice {
                device_type: DEVICE_TYPE.to_string(),
                friendly_name: friendly_name.into(),
                manufacturer: MANUFACTURER.to_string(),
                model_name: MODEL_NAME.to_string(),
                model_number: MODEL_NUMBER.to_string(),
                udn: format!("{}{}", UDN_PREFIX, short_id),
            },
        }
    }

    /// Arbre XML `root/device/...`
    pub fn to_element(&self) -> Element {
        let d = &self.device;
        let mut device = Element::new("device");

        for (name, value) in [
            ("deviceType", &d.device_type),
            ("friendlyName", &d.friendly_name),
            ("manufacturer", &d.manufacturer),
            ("modelName", &d.model_name),
            ("modelNumber", &d.model_number),
            ("UDN", &d.udn),
        ] {
            let mut elem = Element::new(name);
            elem.children.push(XMLNode::Text(value.clone()));
            device.children.push(XMLNode::Element(elem));
        }

        let mut root = Element::new("root");
        root.children.push(XMLNode::Element(device));
        root
    }

    /// Écrit le document, déclaration XML comprise
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), ControlError> {
        let config = EmitterConfig::new().write_document_declaration(true);

        self.to_element()
            .write_with_config(writer, config)
            .map_err(|e| ControlError::Write(e.to_string()))
    }

    pub fn to_xml(&self) -> Result<String, ControlError> {
        let mut output = Vec::new();
        self.write_to(&mut output)?;
        String::from_utf8(output).map_err(|e| ControlError::Write(e.to_string()))
    }
}
