use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};

/// An illumination mode selected for the acquisition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IlluminationMode {
    pub id: String,
    pub name: Option<String>,
    pub exposure_time: Option<String>,
    pub analog_gain: Option<String>,
    pub illumination_source: Option<String>,
    pub illumination_intensity: Option<String>,
}

/// Read every `<mode Selected="1">` element of `configurations.xml`, in
/// document order.
pub fn read_selected_modes(path: &Path) -> Result<Vec<IlluminationMode>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| StitchError::config(path, format!("cannot read: {e}")))?;
    parse_selected_modes(&text).map_err(|reason| StitchError::config(path, reason))
}

fn parse_selected_modes(text: &str) -> std::result::Result<Vec<IlluminationMode>, String> {
    let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;

    let mut modes = Vec::new();
    for node in doc.descendants().filter(|n| n.has_tag_name("mode")) {
        if node.attribute("Selected") != Some("1") {
            continue;
        }
        let attr = |name: &str| node.attribute(name).map(str::to_owned);
        let id = attr("ID").ok_or_else(|| "selected mode without an ID attribute".to_string())?;
        modes.push(IlluminationMode {
            id,
            name: attr("Name"),
            exposure_time: attr("ExposureTime"),
            analog_gain: attr("AnalogGain"),
            illumination_source: attr("IlluminationSource"),
            illumination_intensity: attr("IlluminationIntensity"),
        });
    }

    Ok(modes)
}
