//! `issuewright config`: show the effective configuration.

use issuewright_config::AppConfig;

pub async fn show(default: bool) -> Result<(), Box<dyn std::error::Error>> {
    if default {
        println!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("# {}", config_path.display());
    println!("{}", render(&config)?);
    Ok(())
}

/// Render as TOML with the token masked.
fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.github.token.is_some() {
        shown.github.token = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".issuewright"));
    }

    #[test]
    fn render_masks_token() {
        let mut config = AppConfig::default();
        config.github.token = Some("ghp_secret".into());
        let out = render(&config).unwrap();
        assert!(!out.contains("ghp_secret"));
        assert!(out.contains("[REDACTED]"));
        assert!(out.contains("max_include_depth = 8"));
    }
}
