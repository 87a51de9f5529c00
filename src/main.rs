use petalfield::{install_panic_hook, SceneConfig};

/// Usage: `petalfield [config.json]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    install_panic_hook();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading scene config from {path}");
            SceneConfig::from_json_file(&path)?
        }
        None => SceneConfig::default(),
    };

    petalfield::run(config)?;
    Ok(())
}
