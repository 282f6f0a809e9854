use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use urania::aspects::{AspectKind, AspectSettings};
use urania::chart::ChartSettings;
use urania::ephemeris::Body;

/// Everything the chart tools read from `configs/urania.toml` and the
/// environment.
#[derive(Debug, Clone, PartialEq)]
pub struct UraniaSettings {
    pub chart: ChartSettings,
    /// Swiss Ephemeris data directory
    pub ephe_path: Option<PathBuf>,
    pub google_maps_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartToml {
    #[serde(default)]
    bodies: Option<Vec<String>>,
    #[serde(default)]
    default_uncertainty_minutes: Option<u32>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AspectsToml {
    #[serde(default)]
    orb: Option<f64>,
    #[serde(default)]
    orbs: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EphemerisToml {
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeocodingToml {
    #[serde(default)]
    google_maps_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RootConfigToml {
    #[serde(default)]
    chart: ChartToml,
    #[serde(default)]
    aspects: AspectsToml,
    #[serde(default)]
    ephemeris: EphemerisToml,
    #[serde(default)]
    geocoding: GeocodingToml,
}

/// Try the usual relative locations of `configs/urania.toml`.
pub fn read_config_toml_text() -> anyhow::Result<String> {
    let paths = ["configs/urania.toml", "../../configs/urania.toml"];
    for p in &paths {
        if let Ok(c) = fs::read_to_string(p) {
            return Ok(c);
        }
    }
    anyhow::bail!("Could not load urania.toml from {:?}", paths);
}

/// Settings from an explicit file, or the default locations. A missing
/// default file is not an error: built-in defaults apply.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<UraniaSettings> {
    let text = match path {
        Some(p) => fs::read_to_string(p)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", p.display()))?,
        None => read_config_toml_text().unwrap_or_else(|e| {
            log::debug!("{e}; using built-in defaults");
            String::new()
        }),
    };
    let settings = parse_settings(&text)?;
    apply_env_overrides(settings, |key| env::var(key).ok())
}

pub fn parse_settings(text: &str) -> anyhow::Result<UraniaSettings> {
    let root: RootConfigToml =
        toml::from_str(text).map_err(|e| anyhow::anyhow!("Failed to parse urania.toml: {e}"))?;
    let RootConfigToml {
        chart,
        aspects,
        ephemeris,
        geocoding,
    } = root;

    let mut settings = ChartSettings::default();
    if let Some(names) = chart.bodies {
        settings.bodies = names
            .iter()
            .map(|n| n.parse::<Body>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("chart.bodies: {e}"))?;
    }
    if let Some(minutes) = chart.default_uncertainty_minutes {
        settings.default_uncertainty_minutes = minutes;
    }
    if let Some(secs) = chart.timeout_secs {
        settings.timeout = Duration::from_secs(secs);
    }
    settings.aspects = aspect_settings(aspects)?;

    let out = UraniaSettings {
        chart: settings,
        ephe_path: ephemeris.path,
        google_maps_api_key: geocoding.google_maps_api_key.filter(|k| !k.trim().is_empty()),
    };
    validate(&out)?;
    Ok(out)
}

fn aspect_settings(toml: AspectsToml) -> anyhow::Result<AspectSettings> {
    let default_orb = toml.orb.unwrap_or(AspectSettings::default().default_orb);
    let mut aspects = AspectSettings::with_orb(default_orb);
    for (name, orb) in toml.orbs {
        let kind = AspectKind::ALL
            .into_iter()
            .find(|k| k.to_string() == name.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("aspects.orbs: unknown aspect '{name}'"))?;
        aspects.orb_overrides.insert(kind, orb);
    }
    Ok(aspects)
}

/// `GOOGLE_MAPS_API_KEY`, `EPHE_PATH` and `URANIA_UNCERTAINTY_MINUTES` win
/// over the file.
pub fn apply_env_overrides(
    mut settings: UraniaSettings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<UraniaSettings> {
    if let Some(key) = var("GOOGLE_MAPS_API_KEY").filter(|k| !k.trim().is_empty()) {
        settings.google_maps_api_key = Some(key);
    }
    if let Some(path) = var("EPHE_PATH").filter(|p| !p.trim().is_empty()) {
        settings.ephe_path = Some(PathBuf::from(path));
    }
    if let Some(minutes) = var("URANIA_UNCERTAINTY_MINUTES") {
        settings.chart.default_uncertainty_minutes = minutes.trim().parse().map_err(|_| {
            anyhow::anyhow!("URANIA_UNCERTAINTY_MINUTES must be a whole number, got '{minutes}'")
        })?;
    }
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &UraniaSettings) -> anyhow::Result<()> {
    let aspects = &settings.chart.aspects;
    let orbs = std::iter::once(aspects.default_orb).chain(aspects.orb_overrides.values().copied());
    for orb in orbs {
        if !(orb > 0.0 && orb <= 15.0) {
            anyhow::bail!("aspect orb {orb} must be in (0, 15]");
        }
    }
    settings.chart.validate().map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.chart, ChartSettings::default());
        assert!(settings.ephe_path.is_none());
        assert!(settings.google_maps_api_key.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let text = r#"
            [chart]
            bodies = ["sun", "moon", "mercury", "venus", "mars", "north node"]
            default_uncertainty_minutes = 30
            timeout_secs = 5

            [aspects]
            orb = 6.0
            orbs = { conjunction = 8.0, Sextile = 3.0 }

            [ephemeris]
            path = "/opt/ephe"

            [geocoding]
            google_maps_api_key = "  "
        "#;
        let settings = parse_settings(text).unwrap();
        assert_eq!(settings.chart.bodies.len(), 6);
        assert_eq!(settings.chart.bodies[5], Body::NorthNode);
        assert_eq!(settings.chart.default_uncertainty_minutes, 30);
        assert_eq!(settings.chart.timeout, Duration::from_secs(5));
        assert_eq!(settings.chart.aspects.orb_for(AspectKind::Square), 6.0);
        assert_eq!(settings.chart.aspects.orb_for(AspectKind::Conjunction), 8.0);
        assert_eq!(settings.chart.aspects.orb_for(AspectKind::Sextile), 3.0);
        assert_eq!(settings.ephe_path, Some(PathBuf::from("/opt/ephe")));
        // Blank keys count as absent
        assert!(settings.google_maps_api_key.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_settings("[chart]\nbodies = [\"vulcan\"]").is_err());
        assert!(parse_settings("[chart]\ndefault_uncertainty_minutes = 0").is_err());
        assert!(parse_settings("[chart]\ndefault_uncertainty_minutes = 181").is_err());
        assert!(parse_settings("[chart]\ntimeout_secs = 0").is_err());
        assert!(parse_settings("[chart]\nbodies = []").is_err());
        assert!(parse_settings("[aspects]\norb = -1.0").is_err());
        assert!(parse_settings("[aspects]\norbs = { quincunx = 2.0 }").is_err());
        assert!(parse_settings("chart = 3").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let base = parse_settings("[geocoding]\ngoogle_maps_api_key = \"from-file\"").unwrap();
        let env = |key: &str| match key {
            "GOOGLE_MAPS_API_KEY" => Some("from-env".to_string()),
            "EPHE_PATH" => Some("/srv/ephe".to_string()),
            "URANIA_UNCERTAINTY_MINUTES" => Some("45".to_string()),
            _ => None,
        };
        let settings = apply_env_overrides(base, env).unwrap();
        assert_eq!(settings.google_maps_api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.ephe_path, Some(PathBuf::from("/srv/ephe")));
        assert_eq!(settings.chart.default_uncertainty_minutes, 45);
    }

    #[test]
    fn invalid_environment_is_rejected() {
        let base = parse_settings("").unwrap();
        let env = |key: &str| (key == "URANIA_UNCERTAINTY_MINUTES").then(|| "soon".to_string());
        assert!(apply_env_overrides(base.clone(), env).is_err());

        let env = |key: &str| (key == "URANIA_UNCERTAINTY_MINUTES").then(|| "500".to_string());
        assert!(apply_env_overrides(base, env).is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let text = read_config_toml_text().unwrap();
        let settings = parse_settings(&text).unwrap();
        assert_eq!(settings.chart, ChartSettings::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(load_settings(Some(Path::new("/nonexistent/urania.toml"))).is_err());
    }
}
