//! Named tile-source presets.
//!
//! A [`Preset`] bundles everything needed to address one slippy-map source:
//! the `{z}/{x}/{y}` URL template, the attribution line owed to the data
//! provider, the zoom range the server actually serves, and any extra
//! request headers. `${VAR}` placeholders in templates (API keys) resolve
//! from the environment when the URL is built.

use crate::coord::TileCoord;
use thiserror::Error;

/// Zoom range granted to user-supplied custom templates.
const CUSTOM_MIN_ZOOM: u8 = 0;
const CUSTOM_MAX_ZOOM: u8 = 22;

/// Errors in preset selection or URL construction.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("unknown tile preset: {0}")]
    UnknownPreset(String),

    #[error("tile URL template references ${{{var}}} but it is not set in the environment")]
    MissingEnvVar { var: String },

    #[error("tile URL template produced an invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A named, pre-configured tile source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    /// URL template with `{z}`, `{x}`, `{y}` placeholders.
    pub url_template: String,
    /// Attribution line for on-screen/legend use.
    pub attribution: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Extra request headers sent with every tile request.
    pub headers: Vec<(String, String)>,
}

impl Preset {
    /// Wraps a user-supplied `{z}/{x}/{y}` template as an ad-hoc preset.
    pub fn custom(url_template: impl Into<String>) -> Self {
        Preset {
            name: "custom".to_string(),
            url_template: url_template.into(),
            attribution: "© map data providers".to_string(),
            min_zoom: CUSTOM_MIN_ZOOM,
            max_zoom: CUSTOM_MAX_ZOOM,
            headers: Vec::new(),
        }
    }

    /// Builds the fully resolved URL for one tile.
    ///
    /// Substitution is plain text replacement; the result is validated as a
    /// URL so template typos surface before any fetch is attempted.
    pub fn tile_url(&self, tile: TileCoord) -> Result<String, PresetError> {
        let resolved = resolve_env_placeholders(&self.url_template)?;
        let url = resolved
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string());
        if let Err(e) = reqwest::Url::parse(&url) {
            return Err(PresetError::InvalidUrl {
                url,
                reason: e.to_string(),
            });
        }
        Ok(url)
    }
}

/// Looks up one of the known presets by name.
pub fn lookup_preset(name: &str) -> Result<Preset, PresetError> {
    let preset = match name {
        "opentopomap" => Preset {
            name: "OpenTopoMap".to_string(),
            url_template: "https://tile.opentopomap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenTopoMap (CC-BY-SA), © OpenStreetMap contributors".to_string(),
            min_zoom: 0,
            max_zoom: 17,
            headers: Vec::new(),
        },
        "esri-satellite" => Preset {
            name: "ESRI World Imagery".to_string(),
            url_template:
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
                    .to_string(),
            attribution: "© Esri, Maxar, Earthstar Geographics".to_string(),
            min_zoom: 0,
            max_zoom: 20,
            headers: Vec::new(),
        },
        "maptiler-satellite" => Preset {
            name: "MapTiler Satellite".to_string(),
            url_template: "https://api.maptiler.com/tiles/satellite/{z}/{x}/{y}.jpg?key=${MAPTILER_KEY}"
                .to_string(),
            attribution: "© MapTiler, © OpenStreetMap contributors, © NASA".to_string(),
            min_zoom: 0,
            max_zoom: 20,
            headers: Vec::new(),
        },
        "stamen-terrain-bg" => Preset {
            name: "Stadia Stamen Terrain BG".to_string(),
            url_template:
                "https://tiles.stadiamaps.com/tiles/stamen_terrain_background/{z}/{x}/{y}.png?api_key=${STADIA_KEY}"
                    .to_string(),
            attribution: "© Stadia Maps, © Stamen Design, © OpenStreetMap contributors".to_string(),
            min_zoom: 0,
            max_zoom: 18,
            headers: Vec::new(),
        },
        other => return Err(PresetError::UnknownPreset(other.to_string())),
    };
    Ok(preset)
}

/// Expands `${VAR}` placeholders from the environment.
fn resolve_env_placeholders(template: &str) -> Result<String, PresetError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            // Unterminated placeholder: keep the raw text, the URL check
            // will reject it if it matters.
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let var = &tail[..end];
        let value = std::env::var(var).map_err(|_| PresetError::MissingEnvVar {
            var: var.to_string(),
        })?;
        out.push_str(&value);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
