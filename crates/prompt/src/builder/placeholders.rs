//! `{{char:N}}` placeholder resolution for lore text.

use serene_core::{ChatSnapshot, LorebookBinding};

const OPEN: &str = "{{char:";
const CLOSE: &str = "}}";

/// The display name a binding points at, if it is present in the chat.
fn bound_name<'a>(binding: &LorebookBinding, chat: &'a ChatSnapshot) -> Option<&'a str> {
    if let Some(character) = binding.character_id.and_then(|id| chat.character(id)) {
        return Some(character.display_name());
    }
    binding
        .persona_id
        .and_then(|id| chat.persona(id))
        .map(|p| p.name.as_str())
}

/// Parse `N}}` at the start of `rest`; returns `N` and the bytes consumed.
fn parse_index(rest: &str) -> Option<(u32, usize)> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !rest[digits..].starts_with(CLOSE) {
        return None;
    }
    let n = rest[..digits].parse().ok()?;
    Some((n, digits + CLOSE.len()))
}

/// Replace every resolvable `{{char:N}}` in `text`.
///
/// Placeholders without a binding, or whose target is not in the chat, are
/// left as written.
pub fn resolve_placeholders(text: &str, bindings: &[LorebookBinding], chat: &ChatSnapshot) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        let Some((n, consumed)) = parse_index(after) else {
            out.push_str(OPEN);
            rest = after;
            continue;
        };
        let whole = &rest[start..start + OPEN.len() + consumed];
        match bindings
            .iter()
            .find(|b| b.binding == n)
            .and_then(|b| bound_name(b, chat))
        {
            Some(name) => out.push_str(name),
            None => {
                tracing::debug!(placeholder = whole, "Unresolved lore placeholder");
                out.push_str(whole);
            }
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}
