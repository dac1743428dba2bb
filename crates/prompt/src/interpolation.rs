//! Variable interpolation for user-authored text.
//!
//! Character cards, lore, and instructions may reference `{{char}}`,
//! `{{character}}`, `{{user}}`, `{{persona}}` and any extra variables the
//! caller supplies. Only bare `{{ name }}` tokens naming a known variable are
//! replaced. Everything else, including unknown names, expressions, block
//! tags and `{{char:N}}` placeholders, is left exactly as written.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid variable regex")
});

/// Named variables available to every substitution.
pub type InterpolationContext = BTreeMap<String, String>;

/// Name used for `{{user}}` when the chat has no persona.
pub const DEFAULT_USER_NAME: &str = "User";

#[derive(Debug, Clone, Copy)]
pub struct InterpolationEngine;

impl Default for InterpolationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpolationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the base context for one compile call.
    pub fn create_context<I, K, V>(
        &self,
        character_name: Option<&str>,
        persona_name: Option<&str>,
        extra: I,
    ) -> InterpolationContext
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let char_name = character_name.unwrap_or_default().to_string();
        let user_name = persona_name.unwrap_or(DEFAULT_USER_NAME).to_string();

        let mut ctx = InterpolationContext::new();
        ctx.insert("char".into(), char_name.clone());
        ctx.insert("character".into(), char_name);
        ctx.insert("user".into(), user_name.clone());
        ctx.insert("persona".into(), user_name);
        for (k, v) in extra {
            ctx.insert(k.into(), v.into());
        }
        ctx
    }

    /// A message-scoped context: `base` with `overrides` applied on top.
    pub fn create_message_context(
        &self,
        base: &InterpolationContext,
        overrides: &InterpolationContext,
    ) -> InterpolationContext {
        let mut ctx = base.clone();
        ctx.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        ctx
    }

    /// Substitute known variables in `template`.
    pub fn interpolate_string(&self, template: &str, ctx: &InterpolationContext) -> String {
        if !template.contains("{{") {
            return template.to_string();
        }
        let mut unknown = 0usize;
        let out = VARIABLE_PATTERN.replace_all(template, |caps: &Captures<'_>| {
            match ctx.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    unknown += 1;
                    caps[0].to_string()
                }
            }
        });
        if unknown > 0 {
            tracing::debug!(unknown, "Left unknown variables as written");
        }
        out.into_owned()
    }

    /// [`interpolate_string`](Self::interpolate_string) over optional text.
    pub fn interpolate_opt(
        &self,
        template: Option<&str>,
        ctx: &InterpolationContext,
    ) -> Option<String> {
        template.map(|t| self.interpolate_string(t, ctx))
    }

    /// Interpolate the string fields of a JSON object in place.
    ///
    /// Only the named `fields` are touched when given; otherwise every
    /// top-level string field is. Non-object values are left alone.
    pub fn interpolate_object(
        &self,
        object: &mut Value,
        ctx: &InterpolationContext,
        fields: Option<&[&str]>,
    ) {
        let Value::Object(map) = object else {
            return;
        };
        for (key, value) in map.iter_mut() {
            if fields.is_some_and(|f| !f.contains(&key.as_str())) {
                continue;
            }
            if let Value::String(text) = value {
                *text = self.interpolate_string(text, ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> InterpolationContext {
        InterpolationEngine::new().create_context(
            Some("Aria"),
            Some("Sam"),
            [("location", "the Gilded Goose")],
        )
    }

    #[test]
    fn context_aliases_names() {
        let ctx = ctx();
        assert_eq!(ctx["char"], "Aria");
        assert_eq!(ctx["character"], "Aria");
        assert_eq!(ctx["user"], "Sam");
        assert_eq!(ctx["persona"], "Sam");
        assert_eq!(ctx["location"], "the Gilded Goose");
    }

    #[test]
    fn missing_persona_uses_default_user() {
        let ctx = InterpolationEngine::new().create_context(
            Some("Aria"),
            None,
            std::iter::empty::<(String, String)>(),
        );
        assert_eq!(ctx["user"], DEFAULT_USER_NAME);
    }

    #[test]
    fn substitutes_variables() {
        let engine = InterpolationEngine::new();
        let out = engine.interpolate_string("{{char}} greets {{user}} at {{location}}.", &ctx());
        assert_eq!(out, "Aria greets Sam at the Gilded Goose.");
    }

    #[test]
    fn plain_text_passes_through() {
        let engine = InterpolationEngine::new();
        assert_eq!(engine.interpolate_string("no vars\n", &ctx()), "no vars\n");
    }

    #[test]
    fn unclosed_tag_is_left_alone() {
        let engine = InterpolationEngine::new();
        let text = "{{char greets {{user}}";
        assert_eq!(engine.interpolate_string(text, &ctx()), "{{char greets Sam");
    }

    #[test]
    fn expressions_and_blocks_are_not_evaluated() {
        let engine = InterpolationEngine::new();
        let out = engine.interpolate_string("I rolled {{ 6 * 7 }} and said {{ user }}", &ctx());
        assert_eq!(out, "I rolled {{ 6 * 7 }} and said Sam");

        let loop_text = "{% for i in range(3) %}{{ char }}{% endfor %}";
        assert_eq!(
            engine.interpolate_string(loop_text, &ctx()),
            "{% for i in range(3) %}Aria{% endfor %}"
        );
        assert_eq!(
            engine.interpolate_string("{{ char | upper }}", &ctx()),
            "{{ char | upper }}"
        );
    }

    #[test]
    fn unknown_names_and_placeholders_survive() {
        let engine = InterpolationEngine::new();
        let text = "{{char:3}} once met {{user}} and {{nobody}}.";
        let out = engine.interpolate_string(text, &ctx());
        assert_eq!(out, "{{char:3}} once met Sam and {{nobody}}.");
    }

    #[test]
    fn trailing_newline_is_kept() {
        let engine = InterpolationEngine::new();
        assert_eq!(engine.interpolate_string("{{char}}\n", &ctx()), "Aria\n");
    }

    #[test]
    fn optional_text_is_noop_on_none() {
        let engine = InterpolationEngine::new();
        assert_eq!(engine.interpolate_opt(None, &ctx()), None);
        assert_eq!(
            engine.interpolate_opt(Some("{{user}}"), &ctx()).as_deref(),
            Some("Sam")
        );
    }

    #[test]
    fn message_context_overrides_win() {
        let engine = InterpolationEngine::new();
        let base = ctx();
        let overrides = InterpolationContext::from([("char".to_string(), "Bram".to_string())]);
        let msg_ctx = engine.create_message_context(&base, &overrides);
        assert_eq!(msg_ctx["char"], "Bram");
        assert_eq!(msg_ctx["user"], "Sam");
        assert_eq!(base["char"], "Aria");
    }

    #[test]
    fn object_whitelist_limits_fields() {
        let engine = InterpolationEngine::new();
        let mut obj = json!({
            "description": "{{char}} is tall.",
            "personality": "{{char}} is kind.",
            "age": 30
        });
        engine.interpolate_object(&mut obj, &ctx(), Some(&["description"]));
        assert_eq!(obj["description"], "Aria is tall.");
        assert_eq!(obj["personality"], "{{char}} is kind.");
        assert_eq!(obj["age"], 30);

        engine.interpolate_object(&mut obj, &ctx(), None);
        assert_eq!(obj["personality"], "Aria is kind.");
    }
}
