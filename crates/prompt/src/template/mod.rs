//! Prompt templates and prompt formats.

pub mod context;
pub mod format;
pub mod renderer;
pub mod split_chat;

pub use context::{
    CharacterContext, HistoryContext, LoreContext, MessageContext, PersonaContext,
    PlaceholderContext, TemplateContext,
};
pub use format::{close_marker, make_block, open_marker};
pub use renderer::TemplateRenderer;
pub use split_chat::parse_split_chat;

/// The built-in prompt template.
pub const DEFAULT_TEMPLATE: &str = r#"{% filter systemBlock %}
{{ instructions }}
{% if scenario %}

## Scenario
{{ scenario }}
{% endif %}
{% if characters %}

## Characters
{% for character in characters %}

### {{ character.name }}{% if character.nickname %} ({{ character.nickname }}){% endif %}

{% if character.description %}
{{ character.description }}
{% endif %}
{% if character.personality %}
Personality: {{ character.personality }}
{% endif %}
{% if character.exampleDialogue %}
Example dialogue:
{{ character.exampleDialogue }}
{% endif %}
{% endfor %}
{% endif %}
{% if personas %}

## Personas
{% for persona in personas %}

### {{ persona.name }}
{% if persona.description %}
{{ persona.description }}
{% endif %}
{% endfor %}
{% endif %}
{% if worldLore or characterLore %}

## Lore
{% for entry in worldLore %}
- {{ entry.content }}
{% endfor %}
{% for entry in characterLore %}
- {{ entry.content }}
{% endfor %}
{% endif %}
{% if history %}

## History
{% for entry in history %}
- {% if entry.date %}{{ entry.date }}: {% endif %}{{ entry.content }}
{% endfor %}
{% endif %}
{% endfilter %}
{% for message in chatMessages %}
{{ block(message.role, message.name ~ ": " ~ message.content) }}{% endfor %}
{% if postHistoryInstructions %}
{% filter systemBlock %}
{{ postHistoryInstructions }}
{% endfilter %}
{% endif %}
{% if placeholder %}
{{ blockOpen(placeholder.role) }}{{ placeholder.name }}:{% endif %}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serene_core::{PromptFormat, Role};

    fn ctx() -> TemplateContext {
        TemplateContext {
            instructions: "You are Aria.".into(),
            scenario: Some("A rainy tavern.".into()),
            characters: vec![CharacterContext {
                name: "Aria".into(),
                nickname: Some("Ari".into()),
                description: Some("A bard.".into()),
                ..CharacterContext::default()
            }],
            world_lore: vec![LoreContext {
                name: String::new(),
                content: "Dragons are real.".into(),
            }],
            history: vec![HistoryContext {
                date: Some("Year 3".into()),
                content: "The keep fell.".into(),
            }],
            chat_messages: vec![MessageContext {
                id: 1,
                role: Role::User,
                name: "Sam".into(),
                content: "Hello".into(),
            }],
            placeholder: Some(PlaceholderContext {
                role: Role::Assistant,
                name: "Aria".into(),
            }),
            char: "Aria".into(),
            user: "Sam".into(),
            ..TemplateContext::default()
        }
    }

    #[test]
    fn default_template_renders_all_sections() {
        let out = TemplateRenderer::new(PromptFormat::ChatMl)
            .render(DEFAULT_TEMPLATE, &ctx())
            .unwrap();
        assert!(out.starts_with("<|im_start|>system\nYou are Aria.\n\n## Scenario\nA rainy tavern.\n"));
        assert!(out.contains("### Aria (Ari)\nA bard.\n"));
        assert!(out.contains("## Lore\n- Dragons are real.\n"));
        assert!(out.contains("- Year 3: The keep fell.<|im_end|>\n"));
        assert!(out.contains("<|im_start|>user\nSam: Hello<|im_end|>\n"));
        assert!(out.ends_with("<|im_start|>assistant\nAria:"));
    }

    #[test]
    fn default_template_omits_empty_sections() {
        let ctx = TemplateContext {
            instructions: "Hi.".into(),
            ..TemplateContext::default()
        };
        let out = TemplateRenderer::new(PromptFormat::ChatMl)
            .render(DEFAULT_TEMPLATE, &ctx)
            .unwrap();
        assert_eq!(out, "<|im_start|>system\nHi.<|im_end|>\n");
    }

    #[test]
    fn default_template_parses() {
        assert!(
            TemplateRenderer::new(PromptFormat::Basic)
                .validate(DEFAULT_TEMPLATE)
                .is_ok()
        );
    }
}
