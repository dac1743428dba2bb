//! Fixed open/close markers for each prompt format.
//!
//! | Format | Open | Close |
//! |--------|------|-------|
//! | ChatML | `<\|im_start\|>{role}\n` | `<\|im_end\|>\n` |
//! | Basic | `*** {role}\n` | `\n\n` |
//! | Vicuna | `### {Role}:\n` | `\n` |
//! | OpenAI | `<\|{role}\|>\n` | `\n` |
//! | Llama2-Instruct | system `<s>[INST] <<SYS>>\n`, else `<s>\n` | system `\n<</SYS>> [/INST]></s>\n`, else `\n</s>\n` |
//! | Claude | system/user `Human: `, assistant `\nAssistant: ` | `\n` |
//! | Instruct | system/user `### Instruction:\n`, assistant `### Response:\n` | `\n` |
//! | Split-Chat | `<@role:{role}>\n` | `\n` |

use serene_core::{PromptFormat, Role};

pub fn open_marker(format: PromptFormat, role: Role) -> String {
    match format {
        PromptFormat::ChatMl => format!("<|im_start|>{role}\n"),
        PromptFormat::Basic => format!("*** {role}\n"),
        PromptFormat::Vicuna => format!("### {}:\n", role.title()),
        PromptFormat::OpenAi => format!("<|{role}|>\n"),
        PromptFormat::Llama2Instruct => match role {
            Role::System => "<s>[INST] <<SYS>>\n".into(),
            _ => "<s>\n".into(),
        },
        PromptFormat::Claude => match role {
            Role::Assistant => "\nAssistant: ".into(),
            _ => "Human: ".into(),
        },
        PromptFormat::Instruct => match role {
            Role::Assistant => "### Response:\n".into(),
            _ => "### Instruction:\n".into(),
        },
        PromptFormat::SplitChat => format!("<@role:{role}>\n"),
    }
}

pub fn close_marker(format: PromptFormat, role: Role) -> &'static str {
    match format {
        PromptFormat::ChatMl => "<|im_end|>\n",
        PromptFormat::Basic => "\n\n",
        PromptFormat::Llama2Instruct => match role {
            Role::System => "\n<</SYS>> [/INST]></s>\n",
            _ => "\n</s>\n",
        },
        PromptFormat::Vicuna
        | PromptFormat::OpenAi
        | PromptFormat::Claude
        | PromptFormat::Instruct
        | PromptFormat::SplitChat => "\n",
    }
}

/// Wrap `content` in the markers for `role`.
///
/// Without `include_close` only the open marker and content are emitted,
/// leaving the block open for the model to continue.
pub fn make_block(format: PromptFormat, role: Role, content: &str, include_close: bool) -> String {
    let mut block = open_marker(format, role);
    block.push_str(content);
    if include_close {
        block.push_str(close_marker(format, role));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(format: PromptFormat) -> String {
        make_block(format, Role::User, "hi", true)
    }

    #[test]
    fn chatml_blocks() {
        assert_eq!(user(PromptFormat::ChatMl), "<|im_start|>user\nhi<|im_end|>\n");
        assert_eq!(
            make_block(PromptFormat::ChatMl, Role::Assistant, "hi", false),
            "<|im_start|>assistant\nhi"
        );
    }

    #[test]
    fn basic_blocks() {
        assert_eq!(user(PromptFormat::Basic), "*** user\nhi\n\n");
        assert_eq!(
            make_block(PromptFormat::Basic, Role::System, "hi", false),
            "*** system\nhi"
        );
    }

    #[test]
    fn vicuna_blocks() {
        assert_eq!(user(PromptFormat::Vicuna), "### User:\nhi\n");
        assert_eq!(
            make_block(PromptFormat::Vicuna, Role::Assistant, "hi", false),
            "### Assistant:\nhi"
        );
    }

    #[test]
    fn openai_blocks() {
        assert_eq!(user(PromptFormat::OpenAi), "<|user|>\nhi\n");
        assert_eq!(
            make_block(PromptFormat::OpenAi, Role::System, "hi", false),
            "<|system|>\nhi"
        );
    }

    #[test]
    fn llama2_blocks() {
        assert_eq!(
            make_block(PromptFormat::Llama2Instruct, Role::System, "hi", true),
            "<s>[INST] <<SYS>>\nhi\n<</SYS>> [/INST]></s>\n"
        );
        assert_eq!(user(PromptFormat::Llama2Instruct), "<s>\nhi\n</s>\n");
        assert_eq!(
            make_block(PromptFormat::Llama2Instruct, Role::Assistant, "hi", false),
            "<s>\nhi"
        );
    }

    #[test]
    fn claude_blocks() {
        assert_eq!(user(PromptFormat::Claude), "Human: hi\n");
        assert_eq!(
            make_block(PromptFormat::Claude, Role::Assistant, "hi", true),
            "\nAssistant: hi\n"
        );
        assert_eq!(
            make_block(PromptFormat::Claude, Role::Assistant, "", false),
            "\nAssistant: "
        );
    }

    #[test]
    fn instruct_blocks() {
        assert_eq!(user(PromptFormat::Instruct), "### Instruction:\nhi\n");
        assert_eq!(
            make_block(PromptFormat::Instruct, Role::Assistant, "hi", true),
            "### Response:\nhi\n"
        );
    }

    #[test]
    fn split_chat_blocks() {
        assert_eq!(user(PromptFormat::SplitChat), "<@role:user>\nhi\n");
        assert_eq!(
            make_block(PromptFormat::SplitChat, Role::Assistant, "hi", false),
            "<@role:assistant>\nhi"
        );
    }
}
