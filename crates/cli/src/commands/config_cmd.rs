//! `breathwise config`: Print the default configuration.

use breathwise_config::AppConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    println!("# Save as {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", AppConfig::default_toml());
    Ok(())
}

#[cfg(test)]
mod tests {
    use breathwise_config::AppConfig;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".breathwise"));
    }

    #[test]
    fn default_toml_parses_back() {
        let parsed: AppConfig = toml::from_str(&AppConfig::default_toml()).unwrap();
        assert_eq!(parsed.gateway.port, AppConfig::default().gateway.port);
        parsed.validate().unwrap();
    }
}
