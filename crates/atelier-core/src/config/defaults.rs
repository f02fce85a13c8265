//! Default values for Atelier configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default max tokens for LLM responses.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature for planning/synthesis calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.6;

// OpenAI defaults
/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

// Anthropic defaults
/// Default Anthropic API URL.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
/// Default Anthropic API version.
pub const DEFAULT_ANTHROPIC_API_VERSION: &str = "2023-06-01";

// ============================================================================
// Session Defaults
// ============================================================================

/// Default research depth (1-3) when none is configured.
pub const DEFAULT_DEPTH: u8 = 2;

/// How many trailing history messages the router sees when classifying a
/// follow-up question.
pub const ROUTER_HISTORY_WINDOW: usize = 6;

// ============================================================================
// Tool Defaults
// ============================================================================

/// Row cap for structured-query results. The true row count is always
/// reported alongside the truncated rows.
pub const SQL_ROW_CAP: usize = 200;

/// Number of top-ranked chunks the document tool retrieves per sub-question.
pub const RETRIEVAL_TOP_K: usize = 5;

/// Default path of the sales database.
pub const DEFAULT_SALES_DB: &str = "db/sales.db";

/// Default path of the document chunk store.
pub const DEFAULT_CHUNK_DB: &str = "db/chunks.db";
