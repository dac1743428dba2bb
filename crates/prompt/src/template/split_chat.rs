//! Parse split-chat renderings into role-tagged messages.
//!
//! A split-chat prompt is a sequence of `<@role:{role}>\n...` segments.
//! Each segment becomes one message; trailing newlines are dropped and
//! empty segments skipped. Text before the first marker is kept as a
//! system message.

use serene_core::{PromptMessage, Role};

const OPEN: &str = "<@role:";

/// Find the next valid role marker at or after `from`.
///
/// Returns `(marker_start, content_start, role)`.
fn next_marker(text: &str, from: usize) -> Option<(usize, usize, Role)> {
    let mut search = from;
    while let Some(rel) = text[search..].find(OPEN) {
        let start = search + rel;
        let after = start + OPEN.len();
        if let Some(close) = text[after..].find('>') {
            if let Ok(role) = text[after..after + close].parse::<Role>() {
                let mut end = after + close + 1;
                if text[end..].starts_with('\n') {
                    end += 1;
                }
                return Some((start, end, role));
            }
        }
        search = after;
    }
    None
}

fn push_segment(messages: &mut Vec<PromptMessage>, role: Option<Role>, segment: &str) {
    let content = segment.trim_end_matches('\n');
    if content.trim().is_empty() {
        return;
    }
    messages.push(PromptMessage::new(role.unwrap_or(Role::System), content));
}

pub fn parse_split_chat(text: &str) -> Vec<PromptMessage> {
    let mut messages = Vec::new();
    let mut cursor = 0;
    let mut current = None;

    while let Some((start, end, role)) = next_marker(text, cursor) {
        push_segment(&mut messages, current, &text[cursor..start]);
        current = Some(role);
        cursor = end;
    }
    push_segment(&mut messages, current, &text[cursor..]);

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_segments() {
        let text = "<@role:system>\nBe Aria.\n<@role:user>\nSam: hi\n<@role:assistant>\nAria: hello\n";
        let messages = parse_split_chat(text);
        assert_eq!(
            messages,
            vec![
                PromptMessage::new(Role::System, "Be Aria."),
                PromptMessage::new(Role::User, "Sam: hi"),
                PromptMessage::new(Role::Assistant, "Aria: hello"),
            ]
        );
    }

    #[test]
    fn keeps_inner_newlines() {
        let messages = parse_split_chat("<@role:user>\nline one\n\nline two\n\n");
        assert_eq!(messages[0].content, "line one\n\nline two");
    }

    #[test]
    fn skips_empty_segments() {
        let messages = parse_split_chat("<@role:system>\n\n<@role:user>\nhi\n");
        assert_eq!(messages, vec![PromptMessage::new(Role::User, "hi")]);
    }

    #[test]
    fn unknown_roles_are_plain_text() {
        let messages = parse_split_chat("<@role:user>\nsee <@role:narrator> here\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "see <@role:narrator> here");
    }

    #[test]
    fn leading_text_becomes_system() {
        let messages = parse_split_chat("preamble\n<@role:user>\nhi\n");
        assert_eq!(messages[0], PromptMessage::new(Role::System, "preamble"));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_split_chat("").is_empty());
    }
}
