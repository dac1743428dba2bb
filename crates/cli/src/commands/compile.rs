//! `serene compile`: Compile a chat snapshot into a prompt.
//!
//! The input is JSON shaped like `CompileRequest`, or a bare chat snapshot
//! when `--character` names the speaker. Engine config fills in anything the
//! request leaves out; command-line flags win over both.

use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;
use serene_config::EngineConfig;
use serene_core::{CompiledPrompt, PromptFormat};
use serene_prompt::{CompileRequest, LoreMatchingEngine, PromptBuilder};

#[derive(Args, Debug, Default)]
pub struct CompileArgs {
    /// Request file (JSON), `-` for stdin
    #[arg(default_value = "-")]
    pub input: String,

    /// Id of the character whose turn is compiled
    #[arg(long)]
    pub character: Option<i64>,

    /// Id of the persona the player speaks as
    #[arg(long)]
    pub persona: Option<i64>,

    /// Prompt format (chatml, vicuna, llama2_instruct, split_chat, ...)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Context token limit
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Token counter name
    #[arg(short, long)]
    pub tokenizer: Option<String>,

    /// Emit role-tagged messages instead of a single prompt
    #[arg(long)]
    pub chat_style: bool,

    /// Template file overriding the request and config templates
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Seed for example-dialogue selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,

    /// Print only the prompt text (or messages) without metadata
    #[arg(long)]
    pub text: bool,
}

pub async fn run(config_path: Option<&Path>, args: CompileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    let raw = super::read_input(&args.input)
        .map_err(|e| format!("Failed to read request '{}': {e}", args.input))?;
    let overlay: Value =
        serde_json::from_str(&raw).map_err(|e| format!("Request is not valid JSON: {e}"))?;
    let request = build_request(&config, overlay, &args)?;

    let matching = LoreMatchingEngine::from_config(&config.matching, None).await?;
    let mut builder = PromptBuilder::new(config).with_matching(matching);
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }

    let compiled = builder.compile(&request).await?;
    print_result(&compiled, &args)?;
    Ok(())
}

/// Layer config defaults, the JSON request, and flags into one request.
pub fn build_request(
    config: &EngineConfig,
    overlay: Value,
    args: &CompileArgs,
) -> Result<CompileRequest, Box<dyn std::error::Error>> {
    let mut defaults = CompileRequest::default();
    defaults.sampling.context_tokens = config.prompt.context_tokens;
    defaults.context.format = config.prompt.format;
    defaults.context.template = config.load_template()?;
    defaults.connection.chat_style = config.prompt.chat_style;
    defaults.connection.tokenizer = config.tokenizer.counter_name();
    defaults.prompt.system_instructions = config.prompt.system_instructions.clone();

    // A bare snapshot has no `chat` key
    let overlay = match overlay {
        Value::Object(map) if !map.contains_key("chat") => {
            serde_json::json!({ "chat": Value::Object(map) })
        }
        other => other,
    };

    let mut merged = serde_json::to_value(&defaults)?;
    merge_json(&mut merged, overlay);
    let mut request: CompileRequest = serde_json::from_value(merged)?;

    if let Some(id) = args.character {
        request.current_character_id = id;
    }
    if let Some(id) = args.persona {
        request.current_persona_id = Some(id);
    }
    if let Some(format) = &args.format {
        request.connection.prompt_format = Some(PromptFormat::from_name(format));
    }
    if let Some(limit) = args.limit {
        request.sampling.context_tokens = limit;
    }
    if let Some(tokenizer) = &args.tokenizer {
        request.connection.tokenizer = tokenizer.clone();
    }
    if args.chat_style {
        request.connection.chat_style = true;
    }
    if let Some(path) = &args.template {
        let template = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read template {}: {e}", path.display()))?;
        request.context.template = Some(template);
    }

    tracing::debug!(
        chat_id = request.chat.id,
        character_id = request.current_character_id,
        limit = request.sampling.context_tokens,
        tokenizer = %request.connection.tokenizer,
        "Built compile request"
    );
    Ok(request)
}

/// Recursively merge `overlay` into `base`; objects merge, anything else
/// replaces.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn print_result(compiled: &CompiledPrompt, args: &CompileArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.text {
        if let Some(prompt) = &compiled.prompt {
            println!("{prompt}");
        }
        if let Some(messages) = &compiled.messages {
            for message in messages {
                println!("[{}]\n{}\n", message.role, message.content);
            }
        }
        return Ok(());
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(compiled)?
    } else {
        serde_json::to_string(compiled)?
    };
    println!("{json}");
    Ok(())
}
