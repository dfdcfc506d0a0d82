/*!
 * Instruction interpretation.
 *
 * - `prompts`: prompt construction for both command modes
 * - `cache`: bounded LRU + TTL cache of completions
 * - `service`: provider access through the cache
 */

pub mod cache;
pub mod prompts;
pub mod service;

pub use cache::{CompletionCache, CompletionCacheStats};
pub use prompts::{CommandMode, SYSTEM_PROMPT, build_prompt, free_form_prompt, operations_prompt};
pub use service::{CompletionService, strip_code_fences};
