use loudness_meter_lib::config::MeterConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = std::env::args().nth(1);
    let config = MeterConfig::load(settings_path.as_deref())?;

    loudness_meter_lib::run(config).await
}
