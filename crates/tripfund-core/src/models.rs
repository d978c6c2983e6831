//! Domain models for Tripfund

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default currency for new expenses
pub const DEFAULT_CURRENCY: &str = "CNY";

/// Maximum length of an expense description (characters)
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Expense category
///
/// Declaration order is the display order used in budget breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Activity,
    Shopping,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Accommodation => "accommodation",
            Self::Activity => "activity",
            Self::Shopping => "shopping",
            Self::Other => "other",
        }
    }

    pub fn all() -> &'static [ExpenseCategory] {
        &[
            Self::Food,
            Self::Transport,
            Self::Accommodation,
            Self::Activity,
            Self::Shopping,
            Self::Other,
        ]
    }
}

impl std::str::FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" => Ok(Self::Food),
            "transport" => Ok(Self::Transport),
            "accommodation" => Ok(Self::Accommodation),
            "activity" => Ok(Self::Activity),
            "shopping" => Ok(Self::Shopping),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown expense category: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output language for generated advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Chinese, the primary language of the app
    Zh,
    En,
    Ja,
    Ko,
    /// Detect from the user's own text
    #[default]
    Auto,
}

impl Language {
    /// Language used when nothing else can be resolved
    pub const PRIMARY: Language = Language::Zh;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Ko => "ko",
            Self::Auto => "auto",
        }
    }

    /// Instruction sentence asking the model to answer in this language
    ///
    /// `Auto` has no prefix of its own; resolve it first.
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            Self::Zh => "请用中文回答。",
            Self::En => "Please respond in English.",
            Self::Ja => "日本語で回答してください。",
            Self::Ko => "한국어로 답변해 주세요.",
            Self::Auto => "",
        }
    }

    /// Message shown when an analysis request fails
    pub fn analysis_failed_message(&self) -> &'static str {
        match self.resolve_or_primary() {
            Self::En => "Analysis failed, please try again later.",
            Self::Ja => "分析に失敗しました。しばらくしてから再度お試しください。",
            Self::Ko => "분석에 실패했습니다. 잠시 후 다시 시도해 주세요.",
            _ => "分析失败，请稍后重试。",
        }
    }

    /// Replace `Auto` with the primary language
    pub fn resolve_or_primary(self) -> Language {
        match self {
            Self::Auto => Self::PRIMARY,
            other => other,
        }
    }

    /// Resolve `Auto` by detecting the language of `samples`
    pub fn resolve<'a>(self, samples: impl IntoIterator<Item = &'a str>) -> Language {
        match self {
            Self::Auto => {
                let text = samples.into_iter().collect::<Vec<_>>().join(" ");
                detect_language(&text).unwrap_or(Self::PRIMARY)
            }
            other => other,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "chinese" => Ok(Self::Zh),
            "en" | "english" => Ok(Self::En),
            "ja" | "japanese" => Ok(Self::Ja),
            "ko" | "korean" => Ok(Self::Ko),
            "auto" | "" => Ok(Self::Auto),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Share of characters a script needs before it wins detection
const DETECTION_THRESHOLD: f64 = 0.3;

/// Detect the dominant language of free text
///
/// Counts CJK ideographs, kana, hangul and latin letters over all characters.
/// Kana and hangul are checked before ideographs since Japanese text mixes
/// kanji with kana. Returns `None` for text too short or too mixed to call.
pub fn detect_language(text: &str) -> Option<Language> {
    let text = text.trim();
    let (mut han, mut kana, mut hangul, mut latin, mut total) = (0usize, 0usize, 0usize, 0usize, 0usize);

    for c in text.chars() {
        total += 1;
        match c as u32 {
            0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF => han += 1,
            0x3040..=0x309F | 0x30A0..=0x30FF => kana += 1,
            0xAC00..=0xD7AF => hangul += 1,
            _ if c.is_ascii_alphabetic() => latin += 1,
            _ => {}
        }
    }

    if total < 3 {
        return None;
    }

    let ratio = |n: usize| n as f64 / total as f64;
    if ratio(kana) > DETECTION_THRESHOLD {
        Some(Language::Ja)
    } else if ratio(hangul) > DETECTION_THRESHOLD {
        Some(Language::Ko)
    } else if ratio(han) > DETECTION_THRESHOLD {
        Some(Language::Zh)
    } else if ratio(latin) > DETECTION_THRESHOLD {
        Some(Language::En)
    } else {
        None
    }
}

/// Whether a locally held expense has reached the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No account present; the record lives only in this session
    #[default]
    LocalOnly,
    /// Write issued, not yet confirmed
    Pending,
    /// Confirmed by the backing store
    Synced,
    /// Backing-store write failed; the local copy is authoritative
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalOnly => "local_only",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded travel outlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_plan_id: Option<String>,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

/// Expense as entered by a user, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: String,
    /// Occurrence time (defaults to now)
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub travel_plan_id: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl NewExpense {
    pub fn new(category: ExpenseCategory, amount: f64, description: &str) -> Self {
        Self {
            category,
            amount,
            currency: default_currency(),
            description: description.to_string(),
            date: None,
            travel_plan_id: None,
        }
    }

    /// Check field constraints and normalize currency and description
    pub fn validate(mut self) -> Result<Self> {
        if !self.amount.is_finite() {
            return Err(Error::Validation("Amount must be a number".into()));
        }
        if self.amount < 0.0 {
            return Err(Error::Validation("Amount cannot be negative".into()));
        }

        self.description = self.description.trim().to_string();
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::Validation(format!(
                "Description cannot exceed {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        let currency = self.currency.trim().to_uppercase();
        self.currency = if currency.is_empty() {
            default_currency()
        } else {
            currency
        };

        Ok(self)
    }

    /// Turn into a stored expense with the given id
    pub fn into_expense(self, id: String, sync_status: SyncStatus) -> Expense {
        Expense {
            id,
            category: self.category,
            amount: self.amount,
            currency: self.currency,
            description: self.description,
            date: self.date.unwrap_or_else(Utc::now),
            travel_plan_id: self.travel_plan_id,
            sync_status,
        }
    }
}

impl From<&Expense> for NewExpense {
    fn from(expense: &Expense) -> Self {
        Self {
            category: expense.category,
            amount: expense.amount,
            currency: expense.currency.clone(),
            description: expense.description.clone(),
            date: Some(expense.date),
            travel_plan_id: expense.travel_plan_id.clone(),
        }
    }
}

/// Query filter for listing persisted expenses
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub travel_plan_id: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub limit: i64,
    pub offset: i64,
}

impl ExpenseFilter {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn all() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            ..Default::default()
        }
    }
}

/// A page of persisted expenses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpensePage {
    pub expenses: Vec<Expense>,
    /// Total matching rows (ignoring limit/offset)
    pub total: i64,
    /// Sum of amounts on this page
    pub total_amount: f64,
}

/// Display symbol for a currency code
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "CNY" | "JPY" => "¥",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "KRW" => "₩",
        other => other,
    }
}
