//! `serene formats`: List prompt formats and how their blocks look.

use serene_core::{PromptFormat, Role};
use serene_prompt::template::make_block;

pub fn run() {
    for format in PromptFormat::ALL {
        println!("{format}");
        let sample = [Role::System, Role::User, Role::Assistant]
            .into_iter()
            .map(|role| make_block(format, role, role.title(), true))
            .collect::<String>();
        for line in sample.lines() {
            println!("    {line}");
        }
        println!();
    }
}
