//! `serene config`: Configuration management commands.

use std::path::{Path, PathBuf};

use serene_config::EngineConfig;

fn config_file(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| EngineConfig::config_dir().join("engine.toml"))
}

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", config_file(config_path).display());

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   config error: {e}");
            return Err(e.into());
        }
    };
    println!("   config parsed and validated");

    let mut warnings = Vec::new();
    if config.matching.strategy == "vector" {
        warnings.push("matching.strategy = \"vector\" needs an embedder; the CLI falls back to keyword");
    }
    if matches!(config.tokenizer.name.as_str(), "huggingface" | "hf")
        && config.tokenizer.tokenizer_file.is_none()
    {
        warnings.push("tokenizer.name = \"huggingface\" needs tokenizer_file");
    }
    config.load_template()?;
    for w in &warnings {
        println!("   warning: {w}");
    }

    println!();
    println!("   Format:     {}", config.prompt.format);
    println!("   Tokenizer:  {}", config.tokenizer.counter_name());
    println!("   Limit:      {}", config.prompt.context_tokens);
    println!("   Matching:   {}", config.matching.strategy);
    println!(
        "   Template:   {}",
        config
            .prompt
            .template_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".into())
    );
    Ok(())
}

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", config_file(config_path).display());
}

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let dir = EngineConfig::config_dir();
    let path = dir.join("engine.toml");
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, EngineConfig::default_toml())?;
    tracing::info!(path = %path.display(), "Wrote default config");
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = config_file(Some(Path::new("/etc/serene/engine.toml")));
        assert_eq!(path, PathBuf::from("/etc/serene/engine.toml"));
    }

    #[test]
    fn default_path_is_engine_toml() {
        let path = config_file(None);
        assert!(path.ends_with(".serene-pub/engine.toml"));
    }

    #[test]
    fn validate_reads_a_custom_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[prompt]\ncontext_tokens = 1024\n").unwrap();
        assert!(validate(Some(path.as_path())).is_ok());

        std::fs::write(&path, "[scheduler]\nthreshold_percent = 2.0\n").unwrap();
        assert!(validate(Some(path.as_path())).is_err());
    }
}
