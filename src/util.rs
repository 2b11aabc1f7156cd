use std::path::PathBuf;

const CONFIG_PATH: &str = "PAGEWATCH_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./pagewatch.json";

/// Config file named by `PAGEWATCH_CONFIG`, falling back to `./pagewatch.json`
pub fn get_config_path() -> PathBuf {
    config_path_from(std::env::var(CONFIG_PATH).ok())
}

fn config_path_from(value: Option<String>) -> PathBuf {
    value
        .filter(|path| !path.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}
