use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use urania::chart::{BirthInput, ChartAssembler, ComputeRequest};
use urania::ephemeris::EphemerisProvider;
use urania::geo::{GoogleMapsClient, PlaceResolver, StaticPlaces, TimezoneLookup};
use urania::render::RenderPayload;
use urania::time::DstChoice;
use urania::ChartError;
use urania_config::UraniaSettings;

#[derive(Parser)]
#[command(name = "urania", about = "Natal chart calculator")]
struct Cli {
    /// Path to urania.toml (defaults to configs/urania.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a natal chart and print it as JSON
    Compute {
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        dob: String,
        /// Birth time (HH:MM), omit if unknown
        #[arg(long)]
        tob: Option<String>,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        country: String,
        /// Latitude in degrees, skips geocoding (needs --lon)
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude in degrees, east positive
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// IANA zone, skips the timezone lookup
        #[arg(long)]
        tz: Option<String>,
        /// Tropical or Sidereal(Lahiri|FaganBradley|Raman|Krishnamurti)
        #[arg(long, default_value = "Tropical")]
        zodiac: String,
        /// Placidus or WholeSign
        #[arg(long, default_value = "Placidus")]
        house_system: String,
        /// manual or auto
        #[arg(long, default_value = "manual")]
        mode: String,
        /// Auto-mode window in minutes (1-180)
        #[arg(long)]
        uncertainty: Option<u32>,
        /// Occurrence of a repeated local hour
        #[arg(long, value_enum)]
        dst: Option<DstArg>,
        #[arg(long)]
        name: Option<String>,
        /// Use the built-in city table instead of Google Maps
        #[arg(long)]
        offline: bool,
        /// Print the wheel render payload instead of the chart
        #[arg(long)]
        render: bool,
    },
    /// List the cities known offline
    Places,
}

#[derive(Clone, Copy, ValueEnum)]
enum DstArg {
    Earlier,
    Later,
}

impl From<DstArg> for DstChoice {
    fn from(arg: DstArg) -> Self {
        match arg {
            DstArg::Earlier => DstChoice::Earlier,
            DstArg::Later => DstChoice::Later,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// 2 for problems with the request, 1 for everything else.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ChartError>() {
        Some(chart_err) if chart_err.is_caller_error() => 2,
        _ => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = urania_config::load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Places => {
            for place in StaticPlaces::builtin().places() {
                println!(
                    "{}, {}\t{:.4}\t{:.4}\t{}",
                    place.city, place.country, place.location.lat, place.location.lon, place.tz_id
                );
            }
            Ok(())
        }
        Commands::Compute {
            dob,
            tob,
            city,
            country,
            lat,
            lon,
            tz,
            zodiac,
            house_system,
            mode,
            uncertainty,
            dst,
            name,
            offline,
            render,
        } => {
            let request = ComputeRequest {
                name,
                dob,
                tob,
                city,
                country,
                zodiac,
                house_system,
                mode,
                time_uncertainty_minutes: uncertainty,
                dst: dst.map(DstChoice::from),
                lat,
                lon,
                tz,
            };
            let input = BirthInput::from_request(&request)?;
            let assembler = build_assembler(&settings, offline)?;
            log::info!("Computing with {} ephemeris", assembler.provider_name());

            let chart = assembler.compute(&input).await?;
            let json = if render {
                serde_json::to_string_pretty(&RenderPayload::from_chart(&chart)?)?
            } else {
                serde_json::to_string_pretty(&chart)?
            };
            println!("{json}");
            Ok(())
        }
    }
}

fn build_assembler(settings: &UraniaSettings, offline: bool) -> anyhow::Result<ChartAssembler> {
    let provider = ephemeris_provider(settings)?;

    let places: Arc<dyn PlaceResolver>;
    let timezones: Arc<dyn TimezoneLookup>;
    match (&settings.google_maps_api_key, offline) {
        (Some(key), false) => {
            let client = Arc::new(GoogleMapsClient::new(key.clone(), settings.chart.timeout)?);
            places = client.clone();
            timezones = client;
        }
        (key, _) => {
            if key.is_none() && !offline {
                log::warn!("GOOGLE_MAPS_API_KEY not set, using the built-in city table");
            }
            let table = Arc::new(StaticPlaces::builtin());
            places = table.clone();
            timezones = table;
        }
    }

    Ok(ChartAssembler::new(provider, places, timezones, settings.chart.clone())?)
}

#[cfg(feature = "swisseph")]
fn ephemeris_provider(settings: &UraniaSettings) -> anyhow::Result<Arc<dyn EphemerisProvider>> {
    let swiss = urania::ephemeris::SwissEphemeris::new(settings.ephe_path.clone())
        .map_err(ChartError::from)?;
    Ok(Arc::new(swiss))
}

#[cfg(not(feature = "swisseph"))]
fn ephemeris_provider(settings: &UraniaSettings) -> anyhow::Result<Arc<dyn EphemerisProvider>> {
    if let Some(path) = &settings.ephe_path {
        log::warn!(
            "Ephemeris path {} ignored: built without the swisseph feature",
            path.display()
        );
    }
    Ok(Arc::new(urania::ephemeris::AnalyticEphemeris::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urania::EphemerisError;

    #[test]
    fn caller_errors_exit_with_2() {
        let err = anyhow::Error::from(ChartError::PlaceNotFound("Atlantis, Nowhere".to_string()));
        assert_eq!(exit_status(&err), 2);

        let request = ComputeRequest {
            name: None,
            dob: "1995-13-40".to_string(),
            tob: None,
            city: "Ankara".to_string(),
            country: "Turkey".to_string(),
            zodiac: "Tropical".to_string(),
            house_system: "Placidus".to_string(),
            mode: "manual".to_string(),
            time_uncertainty_minutes: None,
            dst: None,
            lat: None,
            lon: None,
            tz: None,
        };
        let err = anyhow::Error::from(BirthInput::from_request(&request).unwrap_err());
        assert_eq!(exit_status(&err), 2);
    }

    #[test]
    fn service_errors_exit_with_1() {
        let upstream = ChartError::UpstreamServiceUnavailable("geocoding timed out".to_string());
        assert_eq!(exit_status(&anyhow::Error::from(upstream)), 1);

        let ephemeris = ChartError::from(EphemerisError::Timeout { seconds: 15 });
        assert_eq!(exit_status(&anyhow::Error::from(ephemeris)), 1);

        assert_eq!(exit_status(&anyhow::anyhow!("Failed to parse urania.toml")), 1);
    }

    #[test]
    #[cfg(not(feature = "swisseph"))]
    fn offline_assembler_uses_builtin_table() {
        let settings = urania_config::parse_settings("").unwrap();
        let assembler = build_assembler(&settings, true).unwrap();
        assert!(!assembler.provider_name().is_empty());
    }
}
