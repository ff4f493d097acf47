//! In-memory `KnowledgeStore` implementation.
//!
//! Backs the CLI (via a serializable snapshot) and the test suites. Real
//! deployments substitute a database-backed implementation of the same trait;
//! the raw persistence layer is deliberately outside this system's scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PRODUCTION_MASTERY_THRESHOLD;
use crate::model::{
    ErrorItem, GrammarRule, GuessRecord, Language, ProficiencyPattern, Submission,
    VocabularyTracking,
};
use crate::results::GradingRecord;
use crate::traits::KnowledgeStore;

/// Serializable contents of a `MemoryStore`, used by the CLI state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub user_levels: Vec<UserLevel>,
    #[serde(default)]
    pub grammar_rules: Vec<LanguageRules>,
    #[serde(default)]
    pub patterns: Vec<ProficiencyPattern>,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyTracking>,
    #[serde(default)]
    pub guesses: Vec<GuessRecord>,
    #[serde(default)]
    pub error_items: Vec<ErrorItem>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub grading_records: Vec<GradingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLevel {
    pub user_id: String,
    pub language: Language,
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageRules {
    pub language: Language,
    pub rules: Vec<GrammarRule>,
}

/// In-memory knowledge store with interior mutability.
pub struct MemoryStore {
    inner: Mutex<StoreSnapshot>,
    production_threshold: u32,
    /// Test hook: simulate an unreachable store.
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot::default())
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            inner: Mutex::new(snapshot),
            production_threshold: PRODUCTION_MASTERY_THRESHOLD,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Copy out the current contents for persistence.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().clone()
    }

    /// Make every store call fail, simulating an unreachable backend.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_user_level(&self, user_id: &str, language: Language, level: u8) {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .user_levels
            .iter_mut()
            .find(|u| u.user_id == user_id && u.language == language)
        {
            existing.level = level;
        } else {
            inner.user_levels.push(UserLevel {
                user_id: user_id.to_string(),
                language,
                level,
            });
        }
    }

    pub fn add_grammar_rule(&self, language: Language, rule: GrammarRule) {
        let mut inner = self.lock();
        if let Some(entry) = inner
            .grammar_rules
            .iter_mut()
            .find(|r| r.language == language)
        {
            entry.rules.push(rule);
        } else {
            inner.grammar_rules.push(LanguageRules {
                language,
                rules: vec![rule],
            });
        }
    }

    pub fn add_vocabulary(&self, row: VocabularyTracking) {
        self.lock().vocabulary.push(row);
    }

    pub fn add_guess(&self, guess: GuessRecord) {
        self.lock().guesses.push(guess);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    pub fn grading_records(&self) -> Vec<GradingRecord> {
        self.lock().grading_records.clone()
    }

    pub fn patterns(&self) -> Vec<ProficiencyPattern> {
        self.lock().patterns.clone()
    }

    pub fn vocabulary_rows(&self) -> Vec<VocabularyTracking> {
        self.lock().vocabulary.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreSnapshot> {
        self.inner.lock().expect("store mutex poisoned")
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("knowledge store unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn user_level(&self, user_id: &str, language: Language) -> anyhow::Result<Option<u8>> {
        self.check_available()?;
        Ok(self
            .lock()
            .user_levels
            .iter()
            .find(|u| u.user_id == user_id && u.language == language)
            .map(|u| u.level))
    }

    async fn grammar_rules(
        &self,
        language: Language,
        min_difficulty: u8,
        max_difficulty: u8,
        cap: usize,
    ) -> anyhow::Result<Vec<GrammarRule>> {
        self.check_available()?;
        Ok(self
            .lock()
            .grammar_rules
            .iter()
            .filter(|r| r.language == language)
            .flat_map(|r| r.rules.iter())
            .filter(|r| r.difficulty_level >= min_difficulty && r.difficulty_level <= max_difficulty)
            .take(cap)
            .cloned()
            .collect())
    }

    async fn recent_errors(
        &self,
        user_id: &str,
        language: Language,
        limit: usize,
    ) -> anyhow::Result<Vec<ErrorItem>> {
        self.check_available()?;
        let mut errors: Vec<ErrorItem> = self
            .lock()
            .error_items
            .iter()
            .filter(|e| e.user_id == user_id && e.language == language)
            .cloned()
            .collect();
        errors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        errors.truncate(limit);
        Ok(errors)
    }

    async fn recent_guesses(
        &self,
        user_id: &str,
        language: Language,
        limit: usize,
    ) -> anyhow::Result<Vec<GuessRecord>> {
        self.check_available()?;
        let mut guesses: Vec<GuessRecord> = self
            .lock()
            .guesses
            .iter()
            .filter(|g| g.user_id == user_id && g.language == language)
            .cloned()
            .collect();
        guesses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        guesses.truncate(limit);
        Ok(guesses)
    }

    async fn weak_patterns(
        &self,
        user_id: &str,
        language: Language,
        mastery_below: f64,
    ) -> anyhow::Result<Vec<ProficiencyPattern>> {
        self.check_available()?;
        Ok(self
            .lock()
            .patterns
            .iter()
            .filter(|p| {
                p.user_id == user_id && p.language == language && p.mastery_level < mastery_below
            })
            .cloned()
            .collect())
    }

    async fn vocabulary(
        &self,
        user_id: &str,
        language: Language,
        cap: usize,
    ) -> anyhow::Result<Vec<VocabularyTracking>> {
        self.check_available()?;
        Ok(self
            .lock()
            .vocabulary
            .iter()
            .filter(|v| v.user_id == user_id && v.language == language)
            .take(cap)
            .cloned()
            .collect())
    }

    async fn create_submission(&self, submission: &Submission) -> anyhow::Result<()> {
        self.check_available()?;
        self.lock().submissions.push(submission.clone());
        Ok(())
    }

    async fn find_pattern(
        &self,
        user_id: &str,
        language: Language,
        category: &str,
        pattern_type: &str,
    ) -> anyhow::Result<Option<ProficiencyPattern>> {
        self.check_available()?;
        Ok(self
            .lock()
            .patterns
            .iter()
            .find(|p| {
                p.user_id == user_id
                    && p.language == language
                    && p.category == category
                    && p.pattern_type == pattern_type
            })
            .cloned())
    }

    async fn upsert_pattern(&self, pattern: &ProficiencyPattern) -> anyhow::Result<()> {
        self.check_available()?;
        let mut inner = self.lock();
        if let Some(existing) = inner.patterns.iter_mut().find(|p| {
            p.user_id == pattern.user_id
                && p.language == pattern.language
                && p.category == pattern.category
                && p.pattern_type == pattern.pattern_type
        }) {
            *existing = pattern.clone();
        } else {
            inner.patterns.push(pattern.clone());
        }
        Ok(())
    }

    async fn record_production(
        &self,
        user_id: &str,
        language: Language,
        word: &str,
    ) -> anyhow::Result<()> {
        self.check_available()?;
        let mut inner = self.lock();
        if let Some(existing) = inner
            .vocabulary
            .iter_mut()
            .find(|v| v.user_id == user_id && v.language == language && v.word == word)
        {
            existing.record_production(self.production_threshold);
        } else {
            let mut row = VocabularyTracking::new(user_id, word, language);
            row.record_production(self.production_threshold);
            inner.vocabulary.push(row);
        }
        Ok(())
    }

    async fn insert_error_item(&self, item: &ErrorItem) -> anyhow::Result<()> {
        self.check_available()?;
        self.lock().error_items.push(item.clone());
        Ok(())
    }

    async fn update_error_item(&self, item: &ErrorItem) -> anyhow::Result<()> {
        self.check_available()?;
        let mut inner = self.lock();
        match inner.error_items.iter_mut().find(|e| e.id == item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => anyhow::bail!("error item not found: {}", item.id),
        }
    }

    async fn get_error_item(&self, id: Uuid) -> anyhow::Result<Option<ErrorItem>> {
        self.check_available()?;
        Ok(self.lock().error_items.iter().find(|e| e.id == id).cloned())
    }

    async fn error_items(
        &self,
        user_id: &str,
        language: Option<Language>,
    ) -> anyhow::Result<Vec<ErrorItem>> {
        self.check_available()?;
        Ok(self
            .lock()
            .error_items
            .iter()
            .filter(|e| e.user_id == user_id && language.map_or(true, |l| e.language == l))
            .cloned()
            .collect())
    }

    async fn due_error_items(
        &self,
        user_id: &str,
        language: Option<Language>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ErrorItem>> {
        self.check_available()?;
        Ok(self
            .lock()
            .error_items
            .iter()
            .filter(|e| e.user_id == user_id && language.map_or(true, |l| e.language == l))
            .filter(|e| e.next_review.map_or(true, |due| due <= now))
            .cloned()
            .collect())
    }

    async fn save_grading_record(&self, record: &GradingRecord) -> anyhow::Result<()> {
        self.check_available()?;
        self.lock().grading_records.push(record.clone());
        Ok(())
    }
}
