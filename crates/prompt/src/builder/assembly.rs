//! Turns a scheduler [`Selection`] into a rendered prompt.
//!
//! Everything that does not depend on the selection (static sections,
//! per-message speaker names, processed lore text) is prepared once; each
//! render only picks rows out of those tables.

use serene_core::{ChatMessage, ChatSnapshot, HistoryEntry, LoreEntry, Role, TemplateError};

use crate::builder::placeholders::resolve_placeholders;
use crate::builder::static_context::StaticContext;
use crate::interpolation::{InterpolationContext, InterpolationEngine};
use crate::scheduler::{Selection, SelectionRenderer};
use crate::template::{
    HistoryContext, LoreContext, MessageContext, PlaceholderContext, TemplateContext,
    TemplateRenderer,
};

/// Speaker name used for system messages.
pub const SYSTEM_SPEAKER: &str = "System";

/// Names the base interpolation context resolves speakers to.
#[derive(Debug, Clone, Copy)]
pub struct Speakers<'a> {
    /// Current character display name
    pub assistant: &'a str,
    /// Current persona name, or the default user name
    pub user: &'a str,
}

/// Build the template row for one chat message.
///
/// The speaker is the message's own character or persona when it is still in
/// the chat; otherwise the role decides.
pub fn message_context(
    message: &ChatMessage,
    chat: &ChatSnapshot,
    speakers: Speakers<'_>,
    engine: &InterpolationEngine,
    base: &InterpolationContext,
) -> MessageContext {
    let mut overrides = InterpolationContext::new();

    let name = if let Some(character) = message.character_id.and_then(|id| chat.character(id)) {
        let name = character.display_name().to_string();
        overrides.insert("char".into(), name.clone());
        overrides.insert("character".into(), name.clone());
        name
    } else if let Some(persona) = message.persona_id.and_then(|id| chat.persona(id)) {
        overrides.insert("user".into(), persona.name.clone());
        overrides.insert("persona".into(), persona.name.clone());
        persona.name.clone()
    } else {
        match message.role {
            Role::User => speakers.user.to_string(),
            Role::Assistant => speakers.assistant.to_string(),
            Role::System => SYSTEM_SPEAKER.to_string(),
        }
    };

    let content = if overrides.is_empty() {
        engine.interpolate_string(&message.content, base)
    } else {
        let ctx = engine.create_message_context(base, &overrides);
        engine.interpolate_string(&message.content, &ctx)
    };

    MessageContext {
        id: message.id,
        role: message.role,
        name,
        content,
    }
}

/// Placeholders resolved, then variables interpolated.
fn process_text(
    text: &str,
    chat: &ChatSnapshot,
    engine: &InterpolationEngine,
    base: &InterpolationContext,
) -> String {
    let bindings = chat
        .lorebook
        .as_ref()
        .map(|l| l.bindings.as_slice())
        .unwrap_or_default();
    engine.interpolate_string(&resolve_placeholders(text, bindings, chat), base)
}

pub fn lore_context(
    entry: &LoreEntry,
    chat: &ChatSnapshot,
    engine: &InterpolationEngine,
    base: &InterpolationContext,
) -> LoreContext {
    LoreContext {
        name: entry.name.clone(),
        content: process_text(&entry.content, chat, engine, base),
    }
}

pub fn history_context(
    entry: &HistoryEntry,
    chat: &ChatSnapshot,
    engine: &InterpolationEngine,
    base: &InterpolationContext,
) -> HistoryContext {
    HistoryContext {
        date: entry.date_label(),
        content: process_text(&entry.content, chat, engine, base),
    }
}

/// Per-source rows, indexed the same way as the scheduler's sources.
#[derive(Debug, Clone, Default)]
pub struct ContentTables {
    pub messages: Vec<MessageContext>,
    pub world_lore: Vec<LoreContext>,
    pub character_lore: Vec<LoreContext>,
    /// History rows with their date sort keys
    pub history: Vec<(HistoryContext, (i32, i32, i32))>,
}

pub struct PromptAssembly<'a> {
    renderer: TemplateRenderer,
    template: &'a str,
    base: TemplateContext,
    tables: ContentTables,
}

impl<'a> PromptAssembly<'a> {
    pub fn new(
        renderer: TemplateRenderer,
        template: &'a str,
        statics: &StaticContext,
        speakers: Speakers<'_>,
        placeholder: Option<PlaceholderContext>,
        tables: ContentTables,
    ) -> Self {
        let base = TemplateContext {
            instructions: statics.instructions.clone(),
            scenario: statics.scenario.clone(),
            characters: statics.characters.clone(),
            personas: statics.personas.clone(),
            post_history_instructions: statics.post_history_instructions.clone(),
            placeholder,
            char: speakers.assistant.to_string(),
            user: speakers.user.to_string(),
            ..TemplateContext::default()
        };
        Self {
            renderer,
            template,
            base,
            tables,
        }
    }

    pub fn messages(&self) -> &[MessageContext] {
        &self.tables.messages
    }

    /// The full template context for `selection`.
    ///
    /// Messages stay in chat order and lore in inclusion order; history is
    /// laid out oldest first.
    pub fn context_for(&self, selection: &Selection) -> TemplateContext {
        let tables = &self.tables;
        let pick = |rows: &[LoreContext], indices: &[usize]| -> Vec<LoreContext> {
            indices.iter().filter_map(|&i| rows.get(i).cloned()).collect()
        };

        let mut history: Vec<&(HistoryContext, (i32, i32, i32))> = selection
            .lore
            .history
            .iter()
            .filter_map(|&i| tables.history.get(i))
            .collect();
        history.sort_by_key(|(_, date)| *date);

        TemplateContext {
            chat_messages: selection
                .messages
                .iter()
                .filter_map(|&i| tables.messages.get(i).cloned())
                .collect(),
            world_lore: pick(&tables.world_lore, &selection.lore.world_lore),
            character_lore: pick(&tables.character_lore, &selection.lore.character_lore),
            history: history.into_iter().map(|(row, _)| row.clone()).collect(),
            ..self.base.clone()
        }
    }
}

impl SelectionRenderer for PromptAssembly<'_> {
    fn render(&self, selection: &Selection) -> Result<String, TemplateError> {
        self.renderer.render(self.template, &self.context_for(selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serene_core::{
        Character, ChatCharacter, ChatPersona, Lorebook, LorebookBinding, Persona, PromptFormat,
    };

    fn chat() -> ChatSnapshot {
        ChatSnapshot {
            id: 1,
            characters: vec![
                ChatCharacter::visible(Character::new(10, "Aria")),
                ChatCharacter::visible(Character::new(11, "Bram")),
            ],
            personas: vec![ChatPersona {
                persona: Persona::new(20, "Sam"),
            }],
            lorebook: Some(Lorebook {
                bindings: vec![LorebookBinding {
                    id: 5,
                    binding: 1,
                    character_id: Some(11),
                    persona_id: None,
                }],
                ..Lorebook::default()
            }),
            ..ChatSnapshot::default()
        }
    }

    fn base(engine: &InterpolationEngine) -> InterpolationContext {
        engine.create_context(Some("Aria"), Some("Sam"), std::iter::empty::<(String, String)>())
    }

    const SPEAKERS: Speakers<'static> = Speakers {
        assistant: "Aria",
        user: "Sam",
    };

    #[test]
    fn speaker_names_follow_message_owner() {
        let engine = InterpolationEngine::new();
        let base = base(&engine);
        let chat = chat();

        let bram = ChatMessage::assistant(1, "I am {{char}}.").with_character(11);
        let ctx = message_context(&bram, &chat, SPEAKERS, &engine, &base);
        assert_eq!(ctx.name, "Bram");
        assert_eq!(ctx.content, "I am Bram.");

        let gone = ChatMessage::assistant(2, "Hi {{user}}").with_character(99);
        let ctx = message_context(&gone, &chat, SPEAKERS, &engine, &base);
        assert_eq!(ctx.name, "Aria");
        assert_eq!(ctx.content, "Hi Sam");

        let user = ChatMessage::user(3, "hello");
        assert_eq!(message_context(&user, &chat, SPEAKERS, &engine, &base).name, "Sam");

        let system = ChatMessage::system(4, "note");
        assert_eq!(
            message_context(&system, &chat, SPEAKERS, &engine, &base).name,
            SYSTEM_SPEAKER
        );
    }

    #[test]
    fn lore_resolves_placeholders_then_variables() {
        let engine = InterpolationEngine::new();
        let entry = LoreEntry::new(1, "forge", "{{char:1}} forges blades for {{char}}.");
        let ctx = lore_context(&entry, &chat(), &engine, &base(&engine));
        assert_eq!(ctx.content, "Bram forges blades for Aria.");
    }

    #[test]
    fn unbound_placeholder_does_not_block_other_variables() {
        let engine = InterpolationEngine::new();
        let entry = LoreEntry::new(1, "", "{{char:3}} once met {{user}}.");
        let ctx = lore_context(&entry, &chat(), &engine, &base(&engine));
        assert_eq!(ctx.content, "{{char:3}} once met Sam.");
    }

    #[test]
    fn message_text_is_not_evaluated() {
        let engine = InterpolationEngine::new();
        let message =
            ChatMessage::user(1, "I rolled {{ 6 * 7 }} and said {{user}}").with_persona(20);
        let ctx = message_context(&message, &chat(), SPEAKERS, &engine, &base(&engine));
        assert_eq!(ctx.content, "I rolled {{ 6 * 7 }} and said Sam");
    }

    #[test]
    fn history_renders_oldest_first() {
        let engine = InterpolationEngine::new();
        let base_ctx = base(&engine);
        let chat = chat();
        let entries = [
            HistoryEntry::new(1, "", "late").dated(1200, Some(5), None),
            HistoryEntry::new(2, "", "early").dated(1100, None, None),
        ];
        let history = entries
            .iter()
            .map(|e| (history_context(e, &chat, &engine, &base_ctx), e.date_key()))
            .collect();

        let assembly = PromptAssembly::new(
            TemplateRenderer::new(PromptFormat::ChatMl),
            "{% for h in history %}{{ h.content }};{% endfor %}",
            &StaticContext::default(),
            SPEAKERS,
            None,
            ContentTables {
                history,
                ..ContentTables::default()
            },
        );
        let mut selection = Selection::default();
        selection.lore.history = vec![0, 1];
        assert_eq!(assembly.render(&selection).unwrap(), "early;late;");
    }

    #[test]
    fn messages_render_in_chat_order() {
        let engine = InterpolationEngine::new();
        let base_ctx = base(&engine);
        let chat = chat();
        let messages = (1..=3)
            .map(|i| {
                let m = ChatMessage::user(i, format!("m{i}"));
                message_context(&m, &chat, SPEAKERS, &engine, &base_ctx)
            })
            .collect();
        let assembly = PromptAssembly::new(
            TemplateRenderer::new(PromptFormat::ChatMl),
            "{% for m in chatMessages %}{{ m.content }} {% endfor %}",
            &StaticContext::default(),
            SPEAKERS,
            None,
            ContentTables {
                messages,
                ..ContentTables::default()
            },
        );
        let mut selection = Selection::default();
        selection.messages.extend([2, 1]);
        assert_eq!(assembly.render(&selection).unwrap(), "m2 m3 ");
    }
}
