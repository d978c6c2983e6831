//! Prompt library and budget analysis prompt builder
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tripfund/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows users to reword the advisor prompt without rebuilding,
//! while automatically getting new default prompts on upgrade.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::budget::BudgetSnapshot;
use crate::error::{Error, Result};
use crate::models::{currency_symbol, Expense, Language, DEFAULT_CURRENCY};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const BUDGET_ANALYSIS: &str = include_str!("../../../prompts/budget_analysis.md");
}

/// Number of most recent expenses listed in the analysis prompt
pub const RECENT_EXPENSE_LIMIT: usize = 5;

/// System role used when a prompt file has no `# System` section
pub const SYSTEM_PROMPT: &str =
    "You are a professional travel budget advisor, skilled at analyzing travel spending and giving practical advice.";

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    BudgetAnalysis,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetAnalysis => "budget_analysis",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[Self::BudgetAnalysis]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::BudgetAnalysis => defaults::BUDGET_ANALYSIS,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// System role instruction, falling back to [`SYSTEM_PROMPT`]
    pub fn system(&self) -> &str {
        self.system_section()
            .filter(|s| !s.is_empty())
            .unwrap_or(SYSTEM_PROMPT)
    }

    /// Render the user section (or the whole prompt) with `{{var}}` replaced
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = self
            .user_section()
            .unwrap_or(self.content.as_str())
            .to_string();
        for (key, value) in vars {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }
        result
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        match self.cache.entry(id) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let prompt = load(self.override_dir.as_ref(), id)?;
                Ok(&*entry.insert(prompt))
            }
        }
    }

    /// Check if a prompt has an override file
    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|dir| dir.join(format!("{}.md", id.as_str())).exists())
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a prompt (checking override first, then default)
fn load(override_dir: Option<&PathBuf>, id: PromptId) -> Result<Prompt> {
    if let Some(dir) = override_dir {
        let override_path = dir.join(format!("{}.md", id.as_str()));
        if override_path.exists() {
            let content = fs::read_to_string(&override_path)?;
            let (metadata, body) = parse_prompt(&content)?;
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
                override_path: Some(override_path),
            });
        }
    }

    let (metadata, body) = parse_prompt(id.default_content())?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
        override_path: None,
    })
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tripfund").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content
        .strip_prefix("---")
        .ok_or_else(|| Error::Config("Prompt must start with YAML frontmatter (---)".into()))?;

    let end = rest.find("---").ok_or_else(|| {
        Error::Config("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Runs until the next top-level header
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

/// Format an amount with its currency symbol, keeping the input precision
fn money(symbol: &str, amount: f64) -> String {
    format!("{}{}", symbol, amount)
}

/// Currency shared by every expense, or the default
fn budget_currency(expenses: &[Expense]) -> &str {
    match expenses.first() {
        Some(first) if expenses.iter().all(|e| e.currency == first.currency) => {
            first.currency.as_str()
        }
        _ => DEFAULT_CURRENCY,
    }
}

/// Build the budget analysis prompt from the embedded template
pub fn build_prompt(
    snapshot: &BudgetSnapshot,
    expenses: &[Expense],
    language: Language,
) -> Result<String> {
    let mut library = PromptLibrary::embedded_only();
    let template = library.get(PromptId::BudgetAnalysis)?;
    Ok(render_budget_prompt(template, snapshot, expenses, language))
}

/// Render the budget analysis template
///
/// `Auto` is resolved from the expense descriptions, then the primary
/// language. Recent expenses are the last [`RECENT_EXPENSE_LIMIT`] in
/// insertion order.
pub fn render_budget_prompt(
    template: &Prompt,
    snapshot: &BudgetSnapshot,
    expenses: &[Expense],
    language: Language,
) -> String {
    let language = language.resolve(expenses.iter().map(|e| e.description.as_str()));
    let symbol = currency_symbol(budget_currency(expenses));

    let category_stats = snapshot
        .category_breakdown
        .iter()
        .map(|(category, totals)| {
            format!(
                "{}: {} ({} entries)",
                category,
                money(symbol, totals.sum),
                totals.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let start = expenses.len().saturating_sub(RECENT_EXPENSE_LIMIT);
    let recent_expenses = expenses[start..]
        .iter()
        .map(|e| {
            let line = format!(
                "- {}: {}",
                e.category,
                money(currency_symbol(&e.currency), e.amount)
            );
            if e.description.is_empty() {
                line
            } else {
                format!("{} ({})", line, e.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let total_budget = money(symbol, snapshot.total_budget);
    let total_spent = money(symbol, snapshot.total_spent);
    let remaining = money(symbol, snapshot.remaining);
    let spent_percentage = snapshot.percentage_display();

    let mut vars = HashMap::new();
    vars.insert("language_prefix", language.prompt_prefix());
    vars.insert("total_budget", total_budget.as_str());
    vars.insert("total_spent", total_spent.as_str());
    vars.insert("spent_percentage", spent_percentage.as_str());
    vars.insert("remaining", remaining.as_str());
    vars.insert("category_stats", category_stats.as_str());
    vars.insert("recent_expenses", recent_expenses.as_str());

    template.render_user(&vars)
}
