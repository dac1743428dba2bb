//! The prompt builder: one compile call from chat snapshot to prompt.
//!
//! `compile` resolves the speakers and static sections, hands the budgeted
//! content to the [`ContentScheduler`], then renders the chosen selection a
//! final time and attaches provenance metadata.

pub mod assembly;
pub mod placeholders;
pub mod static_context;

pub use assembly::{ContentTables, PromptAssembly, Speakers, SYSTEM_SPEAKER};
pub use placeholders::resolve_placeholders;
pub use static_context::{StaticContext, StaticContextBuilder, effective_visibility, resolve_scenario};

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serene_config::EngineConfig;
use serene_core::{
    ChatMessageStats, ChatSnapshot, CompiledPrompt, CompiledPromptMeta, ConnectionProfile,
    ContextConfig, Error, HistoryEntry, LoreEntry, LoreSourceStats, MatchMessage, PromptConfig,
    PromptFormat, PromptSources, Result, Role, SamplingConfig, TokenCounter, TokenCounts,
};
use tracing::{debug, info};

use crate::interpolation::InterpolationEngine;
use crate::iterators::{ContentIterators, HistoryIterator, LoreIterator, MessageIterator};
use crate::matching::LoreMatchingEngine;
use crate::scheduler::{ContentScheduler, ContentSources, SelectionRenderer};
use crate::template::{DEFAULT_TEMPLATE, PlaceholderContext, TemplateRenderer, parse_split_chat};
use crate::tokens::counter_by_name;

/// Everything one compile call reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileRequest {
    pub chat: ChatSnapshot,
    /// The character whose turn is being generated
    pub current_character_id: i64,
    /// Falls back to the chat's first persona
    pub current_persona_id: Option<i64>,
    pub connection: ConnectionProfile,
    pub sampling: SamplingConfig,
    pub context: ContextConfig,
    pub prompt: PromptConfig,
}

pub struct PromptBuilder {
    config: EngineConfig,
    interpolation: InterpolationEngine,
    matching: LoreMatchingEngine,
    counter: Option<Arc<dyn TokenCounter>>,
    rng: StdRng,
}

impl PromptBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            interpolation: InterpolationEngine::new(),
            matching: LoreMatchingEngine::keyword(),
            counter: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed the example-dialogue picker for reproducible output.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Use `counter` instead of the connection's named tokenizer.
    pub fn with_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn with_matching(mut self, matching: LoreMatchingEngine) -> Self {
        self.matching = matching;
        self
    }

    /// For swapping the matching strategy between compiles.
    pub fn matching_mut(&mut self) -> &mut LoreMatchingEngine {
        &mut self.matching
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn counter_for(&self, connection: &ConnectionProfile) -> Result<Arc<dyn TokenCounter>> {
        match &self.counter {
            Some(counter) => Ok(Arc::clone(counter)),
            None => Ok(counter_by_name(&connection.tokenizer)?),
        }
    }

    /// Compile the prompt for the current character's next turn.
    pub async fn compile(&mut self, request: &CompileRequest) -> Result<CompiledPrompt> {
        let chat = &request.chat;
        let current = chat
            .character(request.current_character_id)
            .ok_or(Error::CurrentCharacterMissing {
                chat_id: chat.id,
                character_id: request.current_character_id,
            })?;
        let persona = request
            .current_persona_id
            .and_then(|id| chat.persona(id))
            .or_else(|| chat.personas.first().map(|cp| &cp.persona));

        let chat_style = request.connection.chat_style;
        let format = request
            .connection
            .prompt_format
            .unwrap_or(request.context.format);
        let render_format = if chat_style {
            PromptFormat::SplitChat
        } else {
            format
        };

        let renderer = TemplateRenderer::new(render_format);
        let template = request.context.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        renderer.validate(template)?;

        let counter = self.counter_for(&request.connection)?;
        let limit = request.sampling.context_tokens;

        // ── Static context ──

        let engine = &self.interpolation;
        let base = engine.create_context(
            Some(current.display_name()),
            persona.map(|p| p.name.as_str()),
            std::iter::empty::<(String, String)>(),
        );
        let speakers = Speakers {
            assistant: current.display_name(),
            user: &base["user"],
        };
        let statics = StaticContextBuilder {
            chat,
            current,
            persona,
            prompt: &request.prompt,
            engine,
            base: &base,
        }
        .build(&mut self.rng);

        // ── Budgeted content ──

        let empty_lore: &[LoreEntry] = &[];
        let empty_history: &[HistoryEntry] = &[];
        let (world_lore, character_lore, history) = match &chat.lorebook {
            Some(book) => (
                book.world_lore.as_slice(),
                book.character_lore.as_slice(),
                book.history.as_slice(),
            ),
            None => (empty_lore, empty_lore, empty_history),
        };

        let tables = ContentTables {
            messages: chat
                .messages
                .iter()
                .map(|m| assembly::message_context(m, chat, speakers, engine, &base))
                .collect(),
            world_lore: world_lore
                .iter()
                .map(|e| assembly::lore_context(e, chat, engine, &base))
                .collect(),
            character_lore: character_lore
                .iter()
                .map(|e| assembly::lore_context(e, chat, engine, &base))
                .collect(),
            history: history
                .iter()
                .map(|e| (assembly::history_context(e, chat, engine, &base), e.date_key()))
                .collect(),
        };
        let placeholder = (!chat_style).then(|| PlaceholderContext {
            role: Role::Assistant,
            name: current.display_name().to_string(),
        });
        let prompt_assembly =
            PromptAssembly::new(renderer, template, &statics, speakers, placeholder, tables);

        let match_messages: Vec<MatchMessage<'_>> = prompt_assembly
            .messages()
            .iter()
            .map(|m| MatchMessage {
                id: m.id,
                role: m.role,
                text: &m.content,
            })
            .collect();

        let iterators = ContentIterators {
            messages: MessageIterator::new(
                chat.messages.len(),
                self.config.scheduler.recent_message_window,
            ),
            world_lore: LoreIterator::world_lore(chat),
            character_lore: LoreIterator::character_lore(chat, current.id),
            history: HistoryIterator::new(history),
        };
        let sources = ContentSources {
            messages: &match_messages,
            world_lore,
            character_lore,
            history,
            iterators: &iterators,
        };

        let scheduler = ContentScheduler::new(
            &self.config.scheduler,
            self.config.weights.normalized(),
            limit,
            counter.as_ref(),
            &self.matching,
        );
        let outcome = scheduler.run(&sources, &prompt_assembly).await?;
        debug!(
            iterations = outcome.iterations,
            tokens = outcome.tokens,
            "Scheduler finished"
        );

        // ── Final render ──

        let text = prompt_assembly.render(&outcome.selection)?;
        let total = counter.count_tokens(&text).await?;

        let included_ids: Vec<i64> = outcome
            .selection
            .messages
            .iter()
            .filter_map(|&i| chat.messages.get(i).map(|m| m.id))
            .collect();
        let excluded_ids: Vec<i64> = chat
            .messages
            .iter()
            .enumerate()
            .filter(|(i, _)| !outcome.selection.messages.contains(i))
            .map(|(_, m)| m.id)
            .collect();

        let selected = &outcome.selection.lore;
        let sources = PromptSources {
            characters: statics.character_sources,
            personas: statics.persona_sources,
            scenario: statics.scenario_source,
            world_lore: lore_stats(&selected.world_lore, world_lore, |e| e.id),
            character_lore: lore_stats(&selected.character_lore, character_lore, |e| e.id),
            history: lore_stats(&selected.history, history, |e| e.id),
        };

        info!(
            chat_id = chat.id,
            character = current.display_name(),
            format = %render_format,
            tokens = total,
            limit,
            messages = included_ids.len(),
            total_messages = chat.messages.len(),
            world_lore = sources.world_lore.included_ids.len(),
            character_lore = sources.character_lore.included_ids.len(),
            history = sources.history.included_ids.len(),
            truncation = outcome.truncation.map(|r| r.as_str()),
            "Compiled prompt"
        );

        let meta = CompiledPromptMeta {
            token_counts: TokenCounts { total, limit },
            chat_messages: ChatMessageStats {
                included: included_ids.len(),
                total: chat.messages.len(),
                included_ids,
                excluded_ids,
            },
            sources,
            prompt_format: render_format,
            truncation_reason: outcome.truncation,
        };

        let compiled = if chat_style {
            CompiledPrompt {
                prompt: None,
                messages: Some(parse_split_chat(&text)),
                meta,
            }
        } else {
            CompiledPrompt {
                prompt: Some(text),
                messages: None,
                meta,
            }
        };
        Ok(compiled)
    }
}

/// Included ids (ascending) out of `entries`.
fn lore_stats<T>(selected: &[usize], entries: &[T], id: impl Fn(&T) -> i64) -> LoreSourceStats {
    let mut included_ids: Vec<i64> = selected
        .iter()
        .filter_map(|&i| entries.get(i).map(&id))
        .collect();
    included_ids.sort_unstable();
    LoreSourceStats {
        included_ids,
        total: entries.len(),
    }
}
