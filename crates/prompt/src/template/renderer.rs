//! Template rendering with format-aware role blocks.
//!
//! Templates use Jinja syntax. Besides the usual conditionals and loops
//! they get:
//!
//! - filters `systemBlock`, `userBlock`, `assistantBlock` for
//!   `{% filter systemBlock %}...{% endfilter %}` sections
//! - `block(role, content)` to wrap text for a role named at runtime
//! - `blockOpen(role)` for the open marker alone
//!
//! Block content is trimmed; a block with nothing left renders as nothing.

use minijinja::{Environment, ErrorKind};
use serene_core::{PromptFormat, Role, TemplateError};

use super::context::TemplateContext;
use super::format::{make_block, open_marker};

fn wrap(format: PromptFormat, role: Role, content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    make_block(format, role, trimmed, true)
}

fn parse_role(name: &str) -> Result<Role, minijinja::Error> {
    name.parse::<Role>()
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e))
}

pub struct TemplateRenderer {
    env: Environment<'static>,
    format: PromptFormat,
}

impl TemplateRenderer {
    pub fn new(format: PromptFormat) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        env.add_filter("systemBlock", move |content: String| {
            wrap(format, Role::System, &content)
        });
        env.add_filter("userBlock", move |content: String| {
            wrap(format, Role::User, &content)
        });
        env.add_filter("assistantBlock", move |content: String| {
            wrap(format, Role::Assistant, &content)
        });
        env.add_function(
            "block",
            move |role: String, content: String| -> Result<String, minijinja::Error> {
                Ok(wrap(format, parse_role(&role)?, &content))
            },
        );
        env.add_function(
            "blockOpen",
            move |role: String| -> Result<String, minijinja::Error> {
                Ok(open_marker(format, parse_role(&role)?))
            },
        );

        Self { env, format }
    }

    pub fn format(&self) -> PromptFormat {
        self.format
    }

    /// Check that `template` parses.
    pub fn validate(&self, template: &str) -> Result<(), TemplateError> {
        self.env
            .template_from_str(template)
            .map(|_| ())
            .map_err(|e| TemplateError::Parse(e.to_string()))
    }

    pub fn render(&self, template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
        self.env.render_str(template, ctx).map_err(|e| {
            if e.kind() == ErrorKind::SyntaxError {
                TemplateError::Parse(e.to_string())
            } else {
                TemplateError::Render(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::context::{MessageContext, PlaceholderContext};

    fn ctx() -> TemplateContext {
        TemplateContext {
            instructions: "Be Aria.".into(),
            chat_messages: vec![
                MessageContext {
                    id: 1,
                    role: Role::User,
                    name: "Sam".into(),
                    content: "Hello".into(),
                },
                MessageContext {
                    id: 2,
                    role: Role::Assistant,
                    name: "Aria".into(),
                    content: "Hi!".into(),
                },
            ],
            placeholder: Some(PlaceholderContext {
                role: Role::Assistant,
                name: "Aria".into(),
            }),
            ..TemplateContext::default()
        }
    }

    #[test]
    fn filter_blocks_wrap_trimmed_content() {
        let r = TemplateRenderer::new(PromptFormat::ChatMl);
        let out = r
            .render("{% filter systemBlock %}\n{{ instructions }}\n{% endfilter %}\n", &ctx())
            .unwrap();
        assert_eq!(out, "<|im_start|>system\nBe Aria.<|im_end|>\n");
    }

    #[test]
    fn block_function_uses_runtime_role() {
        let r = TemplateRenderer::new(PromptFormat::Vicuna);
        let template = "{% for m in chatMessages %}\n{{ block(m.role, m.name ~ \": \" ~ m.content) }}{% endfor %}\n";
        let out = r.render(template, &ctx()).unwrap();
        assert_eq!(out, "### User:\nSam: Hello\n### Assistant:\nAria: Hi!\n");
    }

    #[test]
    fn block_open_leaves_slot_open() {
        let r = TemplateRenderer::new(PromptFormat::ChatMl);
        let out = r
            .render(
                "{{ blockOpen(placeholder.role) }}{{ placeholder.name }}:",
                &ctx(),
            )
            .unwrap();
        assert_eq!(out, "<|im_start|>assistant\nAria:");
    }

    #[test]
    fn empty_blocks_render_nothing() {
        let r = TemplateRenderer::new(PromptFormat::ChatMl);
        let out = r
            .render("{% filter userBlock %}  {% endfilter %}", &ctx())
            .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn unknown_role_is_a_render_error() {
        let r = TemplateRenderer::new(PromptFormat::ChatMl);
        let err = r.render("{{ block(\"narrator\", \"x\") }}", &ctx()).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let r = TemplateRenderer::new(PromptFormat::ChatMl);
        assert!(matches!(
            r.render("{% if %}", &ctx()).unwrap_err(),
            TemplateError::Parse(_)
        ));
        assert!(r.validate("{% for x in y %}").is_err());
        assert!(r.validate("{{ instructions }}").is_ok());
    }
}
