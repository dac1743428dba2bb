//! `serene count`: Count tokens with a named counter.

use std::path::Path;

use serene_prompt::counter_by_name;

pub async fn run(
    config_path: Option<&Path>,
    input: &str,
    tokenizer: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = match tokenizer {
        Some(name) => name,
        None => {
            let config =
                super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
            config.tokenizer.counter_name()
        }
    };

    let text = super::read_input(input).map_err(|e| format!("Failed to read '{input}': {e}"))?;
    let counter = counter_by_name(&name)?;
    let tokens = counter.count_tokens(&text).await?;

    println!("{tokens}");
    tracing::debug!(counter = counter.name(), chars = text.chars().count(), tokens, "Counted tokens");
    Ok(())
}
