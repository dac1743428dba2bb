//! Static prompt context: instructions, scenario, roster, personas.
//!
//! Built once per compile before any budgeted content is scheduled.

use rand::Rng;
use rand::seq::SliceRandom;
use serene_core::{
    Character, CharacterSource, ChatCharacter, ChatSnapshot, Persona, PersonaSource, PromptConfig,
    ScenarioSource, Visibility,
};

use crate::interpolation::{InterpolationContext, InterpolationEngine};
use crate::template::{CharacterContext, PersonaContext};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticContext {
    pub instructions: String,
    pub scenario: Option<String>,
    pub scenario_source: Option<ScenarioSource>,
    pub characters: Vec<CharacterContext>,
    pub personas: Vec<PersonaContext>,
    pub post_history_instructions: Option<String>,
    pub character_sources: Vec<CharacterSource>,
    pub persona_sources: Vec<PersonaSource>,
}

/// Visibility after the current-speaker override.
pub fn effective_visibility(chat_character: &ChatCharacter, current_character_id: i64) -> Visibility {
    if chat_character.character.id == current_character_id {
        Visibility::Visible
    } else {
        chat_character.visibility
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Chat scenario wins; a group chat without one has none; otherwise the
/// current character's scenario applies.
pub fn resolve_scenario<'a>(
    chat: &'a ChatSnapshot,
    current: &'a Character,
) -> Option<(&'a str, ScenarioSource)> {
    if let Some(scenario) = non_blank(chat.scenario.as_deref()) {
        return Some((scenario, ScenarioSource::Chat));
    }
    if chat.is_group() {
        return None;
    }
    non_blank(current.scenario.as_deref()).map(|s| (s, ScenarioSource::Character))
}

/// Interpolation context with `char` bound to `name`.
pub fn speaker_context(
    engine: &InterpolationEngine,
    base: &InterpolationContext,
    name: &str,
) -> InterpolationContext {
    let overrides = InterpolationContext::from([
        ("char".to_string(), name.to_string()),
        ("character".to_string(), name.to_string()),
    ]);
    engine.create_message_context(base, &overrides)
}

pub struct StaticContextBuilder<'a> {
    pub chat: &'a ChatSnapshot,
    pub current: &'a Character,
    pub persona: Option<&'a Persona>,
    pub prompt: &'a PromptConfig,
    pub engine: &'a InterpolationEngine,
    pub base: &'a InterpolationContext,
}

impl StaticContextBuilder<'_> {
    pub fn build(&self, rng: &mut impl Rng) -> StaticContext {
        let engine = self.engine;
        let base = self.base;

        let mut ctx = StaticContext {
            instructions: engine.interpolate_string(&self.prompt.system_instructions, base),
            post_history_instructions: engine
                .interpolate_opt(non_blank(self.current.post_history_instructions.as_deref()), base),
            ..StaticContext::default()
        };

        if let Some((scenario, source)) = resolve_scenario(self.chat, self.current) {
            ctx.scenario = Some(engine.interpolate_string(scenario, base));
            ctx.scenario_source = Some(source);
        }

        for chat_character in &self.chat.characters {
            let visibility = effective_visibility(chat_character, self.current.id);
            let character = &chat_character.character;
            if visibility == Visibility::Hidden {
                continue;
            }

            ctx.character_sources.push(CharacterSource {
                id: character.id,
                name: character.name.clone(),
                nickname: character.nickname.clone(),
                visibility,
                is_current: character.id == self.current.id,
            });
            ctx.characters
                .push(self.character_context(character, visibility, rng));
        }

        for chat_persona in &self.chat.personas {
            let persona = &chat_persona.persona;
            ctx.personas.push(PersonaContext {
                name: persona.name.clone(),
                description: engine.interpolate_opt(non_blank(persona.description.as_deref()), base),
            });
            ctx.persona_sources.push(PersonaSource {
                id: persona.id,
                name: persona.name.clone(),
                is_current: self.persona.is_some_and(|p| p.id == persona.id),
            });
        }

        ctx
    }

    fn character_context(
        &self,
        character: &Character,
        visibility: Visibility,
        rng: &mut impl Rng,
    ) -> CharacterContext {
        let mut out = CharacterContext {
            name: character.name.clone(),
            nickname: non_blank(character.nickname.as_deref()).map(str::to_string),
            ..CharacterContext::default()
        };
        if visibility == Visibility::Minimal {
            return out;
        }

        let ctx = speaker_context(self.engine, self.base, character.display_name());
        out.description = self
            .engine
            .interpolate_opt(non_blank(character.description.as_deref()), &ctx);
        out.personality = self
            .engine
            .interpolate_opt(non_blank(character.personality.as_deref()), &ctx);
        out.example_dialogue = character
            .example_dialogues
            .choose(rng)
            .map(|d| self.engine.interpolate_string(d, &ctx));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serene_core::ChatPersona;

    fn aria() -> Character {
        Character {
            id: 10,
            name: "Aria".into(),
            description: Some("{{char}} is a bard who adores {{user}}.".into()),
            scenario: Some("Aria's tavern".into()),
            example_dialogues: vec!["A".into(), "B".into(), "C".into()],
            post_history_instructions: Some("Reply as {{char}}.".into()),
            ..Character::default()
        }
    }

    fn bram() -> Character {
        Character {
            id: 11,
            name: "Bram".into(),
            description: Some("{{char}} is a smith.".into()),
            scenario: Some("Bram's forge".into()),
            ..Character::default()
        }
    }

    fn solo_chat() -> ChatSnapshot {
        ChatSnapshot {
            id: 1,
            characters: vec![ChatCharacter::visible(aria())],
            personas: vec![ChatPersona {
                persona: Persona::new(20, "Sam"),
            }],
            ..ChatSnapshot::default()
        }
    }

    fn build(chat: &ChatSnapshot, current_id: i64, seed: u64) -> StaticContext {
        let engine = InterpolationEngine::new();
        let current = chat.character(current_id).unwrap();
        let persona = chat.personas.first().map(|p| &p.persona);
        let base = engine.create_context(
            Some(current.display_name()),
            persona.map(|p| p.name.as_str()),
            std::iter::empty::<(String, String)>(),
        );
        let prompt = PromptConfig {
            system_instructions: "You are {{char}}.".into(),
        };
        StaticContextBuilder {
            chat,
            current,
            persona,
            prompt: &prompt,
            engine: &engine,
            base: &base,
        }
        .build(&mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn interpolates_instructions_and_cards() {
        let ctx = build(&solo_chat(), 10, 1);
        assert_eq!(ctx.instructions, "You are Aria.");
        assert_eq!(
            ctx.characters[0].description.as_deref(),
            Some("Aria is a bard who adores Sam.")
        );
        assert_eq!(ctx.post_history_instructions.as_deref(), Some("Reply as Aria."));
        assert!(ctx.persona_sources[0].is_current);
    }

    #[test]
    fn scenario_precedence() {
        let mut chat = solo_chat();
        assert_eq!(build(&chat, 10, 1).scenario_source, Some(ScenarioSource::Character));

        chat.characters.push(ChatCharacter::visible(bram()));
        let group = build(&chat, 10, 1);
        assert_eq!(group.scenario_source, None);
        assert_eq!(group.scenario, None);

        chat.scenario = Some("A storm rolls in.".into());
        let with_chat = build(&chat, 10, 1);
        assert_eq!(with_chat.scenario_source, Some(ScenarioSource::Chat));
        assert_eq!(with_chat.scenario.as_deref(), Some("A storm rolls in."));
    }

    #[test]
    fn visibility_filters_roster() {
        let mut chat = solo_chat();
        chat.characters
            .push(ChatCharacter::with_visibility(bram(), Visibility::Hidden));
        let ctx = build(&chat, 10, 1);
        assert_eq!(ctx.characters.len(), 1);
        assert!(ctx.character_sources.iter().all(|c| c.id != 11));

        chat.characters[1].visibility = Visibility::Minimal;
        let ctx = build(&chat, 10, 1);
        assert_eq!(ctx.characters[1].name, "Bram");
        assert_eq!(ctx.characters[1].description, None);
    }

    #[test]
    fn current_speaker_always_fully_visible() {
        let mut chat = solo_chat();
        chat.characters
            .push(ChatCharacter::with_visibility(bram(), Visibility::Hidden));
        let ctx = build(&chat, 11, 1);
        let bram = ctx.characters.iter().find(|c| c.name == "Bram").unwrap();
        assert_eq!(bram.description.as_deref(), Some("Bram is a smith."));
        let source = ctx.character_sources.iter().find(|c| c.id == 11).unwrap();
        assert_eq!(source.visibility, Visibility::Visible);
        assert!(source.is_current);
    }

    #[test]
    fn example_dialogue_is_seeded() {
        let a = build(&solo_chat(), 10, 42);
        let b = build(&solo_chat(), 10, 42);
        assert_eq!(a.characters[0].example_dialogue, b.characters[0].example_dialogue);
        assert!(a.characters[0].example_dialogue.is_some());
    }
}
