//! The Serene Pub prompt compiler.
//!
//! Turns a chat snapshot into a single prompt that fits the model's context
//! window:
//!
//! 1. **Static context**: instructions, scenario, visible characters, personas
//! 2. **Schedule** chat messages, world lore, character lore, and history
//!    through priority tiers under the token budget
//! 3. **Match** lore against the included messages (keyword or vector)
//! 4. **Render** through a prompt template in the connection's block format
//!
//! Over the limit, the oldest messages are trimmed first; the newest ones
//! always survive.

pub mod builder;
pub mod interpolation;
pub mod iterators;
pub mod matching;
pub mod scheduler;
pub mod template;
pub mod tokens;

pub use builder::{CompileRequest, PromptBuilder};
pub use interpolation::{DEFAULT_USER_NAME, InterpolationContext, InterpolationEngine};
pub use iterators::{ContentIterators, TierCursor};
pub use matching::{
    KeywordMatchingStrategy, LoreMatchingEngine, MatchOutcome, VectorMatchingStrategy,
    cosine_similarity,
};
pub use scheduler::{ContentScheduler, InclusionState, Selection, SelectionRenderer};
pub use template::{DEFAULT_TEMPLATE, TemplateContext, TemplateRenderer, parse_split_chat};
pub use tokens::{EstimateCounter, counter_by_name, estimate_tokens};
