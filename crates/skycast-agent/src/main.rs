use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use skycast_agent::BackgroundAgent;
use skycast_core::{App, Config};
use skycast_weather::display::{self, AirQualityTier};
use skycast_weather::{
    CacheStore, Presentation, RefreshCoordinator, SearchSuggester, SqliteStore, ViewState,
    WeatherController, WeatherGateway,
};

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    let mut app = App::new(config);
    let config = app.config();

    let store_path = config.store_path();
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }
    let store = SqliteStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    let cache = CacheStore::new(store);

    let gateway = Arc::new(
        WeatherGateway::new(&config.gateway.base_url, config.gateway.timeout())
            .context("Failed to create weather gateway client")?,
    );
    let coordinator = RefreshCoordinator::with_forecast_days(
        gateway.clone(),
        cache,
        config.weather.forecast_days,
    );
    let handle = BackgroundAgent::new(coordinator, gateway)
        .with_refresh_interval(config.weather.refresh_interval())
        .spawn();

    let client = Arc::new(handle.client());
    let suggester = SearchSuggester::new(client.clone(), config.search.debounce());
    let mut controller = WeatherController::new(client).with_search(suggester);

    app.register(Box::new(handle));
    tracing::info!("Skycast started, store at {}", store_path.display());

    let typed = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if typed.trim().is_empty() {
        controller.start().await;
    } else {
        controller.submit(&typed).await.context("Invalid location")?;
    }
    log_view(&controller.view());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    app.shutdown();
    Ok(())
}

fn log_view(view: &Presentation) {
    match view.state {
        ViewState::Prompt => {
            tracing::info!("No location set. Run `skycast <city, postal code or lat,lon>`");
        }
        ViewState::Loading => tracing::info!("Loading weather"),
        ViewState::Error => {
            tracing::error!(
                "{}",
                view.error_message()
                    .unwrap_or_else(|| "Failed to fetch weather data".to_string())
            );
        }
        ViewState::Ready => {
            let Some(doc) = view.forecast() else {
                return;
            };
            tracing::info!(
                "{} ({}): {:.0}°C, {}, feels like {:.0}°C",
                doc.location.name,
                display::location_subtitle(&doc.location),
                doc.current.temp_c,
                doc.current.condition.text,
                doc.current.feelslike_c
            );
            let aqi = AirQualityTier::for_forecast(doc).unwrap_or(AirQualityTier::Unknown);
            tracing::info!("Air quality: {}", aqi.label());
            if let Some(today) = doc.today() {
                tracing::info!(
                    "Sunrise {}, sunset {}, moon {}",
                    today.astro.sunrise,
                    today.astro.sunset,
                    today.astro.moon_phase
                );
            }
            tracing::info!(
                "UV {} ({})",
                doc.current.uv,
                display::uv_level(doc.current.uv)
            );
            for (index, day) in doc.forecast.forecastday.iter().enumerate() {
                tracing::info!(
                    "{}: {:.0}°/{:.0}° {}",
                    display::day_label(doc, index).unwrap_or_default(),
                    day.day.maxtemp_c,
                    day.day.mintemp_c,
                    day.day.condition.text
                );
            }
            for alert in display::visible_alerts(doc, &HashSet::new()) {
                tracing::warn!("{}: {}", alert.severity, alert.headline);
            }
            if let Some(label) = view.last_updated(Utc::now()) {
                tracing::info!("{}", label);
            }
            if let Some(banner) = &view.banner {
                tracing::warn!("{}", banner);
            }
        }
    }
}
