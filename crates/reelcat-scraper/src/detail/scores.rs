//! Critic and audience score extraction as an ordered cascade of strategies.
//!
//! Each strategy is only asked for the scores still missing after the ones
//! before it. Strategies never fail the record: their errors are logged and
//! the cascade moves on.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ScraperError;
use crate::render::PageHandle;

pub const CRITICS_SCORE_SELECTOR: &str = r#"rt-text[slot="criticsScore"]"#;
pub const AUDIENCE_SCORE_SELECTOR: &str = r#"rt-text[slot="audienceScore"]"#;
/// Tag every score badge on the detail page is rendered in.
const SCORE_TAG_SELECTOR: &str = "rt-text";

/// Reads both slotted score elements from inside the page.
const SCORE_SCRIPT: &str = r#"(() => {
    const scores = {};
    const read = (selector) => {
        const elem = document.querySelector(selector);
        if (!elem) return null;
        const match = elem.textContent.trim().match(/(\d{1,3})/);
        return match ? parseInt(match[1], 10) : null;
    };
    const critics = read('rt-text[slot="criticsScore"]');
    if (critics !== null) scores.tomatometer = critics;
    const audience = read('rt-text[slot="audienceScore"]');
    if (audience !== null) scores.audience = audience;
    return scores;
})()"#;

static FIRST_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}").expect("valid score digits regex"));
static BARE_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})%?$").expect("valid bare percent regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Critic,
    Audience,
}

impl ScoreKind {
    const ALL: [ScoreKind; 2] = [ScoreKind::Critic, ScoreKind::Audience];

    fn selector(self) -> &'static str {
        match self {
            ScoreKind::Critic => CRITICS_SCORE_SELECTOR,
            ScoreKind::Audience => AUDIENCE_SCORE_SELECTOR,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ScoreKind::Critic => "tomatometer",
            ScoreKind::Audience => "audience",
        }
    }
}

/// Scores as read from the page, before range sanitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawScores {
    pub critic: Option<u32>,
    pub audience: Option<u32>,
}

impl RawScores {
    #[must_use]
    pub fn get(&self, kind: ScoreKind) -> Option<u32> {
        match kind {
            ScoreKind::Critic => self.critic,
            ScoreKind::Audience => self.audience,
        }
    }

    fn set(&mut self, kind: ScoreKind, value: Option<u32>) {
        match kind {
            ScoreKind::Critic => self.critic = value,
            ScoreKind::Audience => self.audience = value,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.critic.is_some() && self.audience.is_some()
    }

    /// Kinds not yet resolved, in critic-then-audience order.
    #[must_use]
    pub fn missing(&self) -> Vec<ScoreKind> {
        ScoreKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
            .collect()
    }

    /// Copies values from `found` into slots that are still empty. Returns
    /// how many slots were filled.
    pub fn fill_missing(&mut self, found: RawScores) -> usize {
        let mut filled = 0;
        for kind in ScoreKind::ALL {
            if self.get(kind).is_none() && found.get(kind).is_some() {
                self.set(kind, found.get(kind));
                filled += 1;
            }
        }
        filled
    }
}

/// One way of finding scores on a loaded detail page.
#[async_trait]
pub trait ScoreStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Looks for the kinds in `wanted`. Values for other kinds are ignored
    /// by the cascade.
    async fn probe(
        &self,
        page: &dyn PageHandle,
        wanted: &[ScoreKind],
    ) -> Result<RawScores, ScraperError>;
}

/// Runs `strategies` in order until both scores are known or the list is
/// exhausted.
pub async fn resolve_scores(
    strategies: &[Box<dyn ScoreStrategy>],
    page: &dyn PageHandle,
) -> RawScores {
    let mut scores = RawScores::default();
    for strategy in strategies {
        if scores.is_complete() {
            break;
        }
        let wanted = scores.missing();
        match strategy.probe(page, &wanted).await {
            Ok(found) => {
                let filled = scores.fill_missing(found);
                tracing::debug!(strategy = strategy.name(), filled, "score strategy finished");
            }
            Err(e) => {
                tracing::debug!(strategy = strategy.name(), error = %e, "score strategy failed");
            }
        }
    }
    scores
}

/// Tier 1: the dedicated slotted score elements, each waited for separately.
#[derive(Debug, Clone)]
pub struct SlotSelectorStrategy {
    pub wait: Duration,
}

#[async_trait]
impl ScoreStrategy for SlotSelectorStrategy {
    fn name(&self) -> &'static str {
        "slot_selector"
    }

    async fn probe(
        &self,
        page: &dyn PageHandle,
        wanted: &[ScoreKind],
    ) -> Result<RawScores, ScraperError> {
        let mut found = RawScores::default();
        for &kind in wanted {
            match read_slot(page, kind, self.wait).await {
                Ok(value) => found.set(kind, value),
                Err(e) => {
                    tracing::debug!(score = kind.label(), error = %e, "slotted score unavailable");
                }
            }
        }
        Ok(found)
    }
}

async fn read_slot(
    page: &dyn PageHandle,
    kind: ScoreKind,
    wait: Duration,
) -> Result<Option<u32>, ScraperError> {
    let element = page.wait_for_selector(kind.selector(), wait).await?;
    let Some(text) = element.text_content().await? else {
        return Ok(None);
    };
    let text = text.trim();
    tracing::debug!(score = kind.label(), raw = text, "slotted score text");
    Ok(parse_score_text(text).filter(|value| in_score_range(*value)))
}

/// Tier 2: the same slotted elements read by an in-page script, which sees
/// content the element locator can miss right after hydration.
#[derive(Debug, Clone, Default)]
pub struct ScriptStrategy;

#[async_trait]
impl ScoreStrategy for ScriptStrategy {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn probe(
        &self,
        page: &dyn PageHandle,
        _wanted: &[ScoreKind],
    ) -> Result<RawScores, ScraperError> {
        let value = page.evaluate(SCORE_SCRIPT).await?;
        Ok(scores_from_script(&value))
    }
}

/// Maps the script's `{tomatometer, audience}` object into raw scores.
/// Range checking is left to the final sanitation pass.
fn scores_from_script(value: &serde_json::Value) -> RawScores {
    let read = |key: &str| {
        value
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    RawScores {
        critic: read("tomatometer"),
        audience: read("audience"),
    }
}

/// Tier 3: scan every score-tag element for bare numbers.
///
/// Only fires when exactly two candidates are found, assigning the larger to
/// the critic score and the smaller to the audience score. This is a
/// last-resort guess; nothing on the page guarantees that ordering.
#[derive(Debug, Clone, Default)]
pub struct GenericScanStrategy;

#[async_trait]
impl ScoreStrategy for GenericScanStrategy {
    fn name(&self) -> &'static str {
        "generic_scan"
    }

    async fn probe(
        &self,
        page: &dyn PageHandle,
        _wanted: &[ScoreKind],
    ) -> Result<RawScores, ScraperError> {
        let elements = page.query_all(SCORE_TAG_SELECTOR).await?;
        let mut candidates = Vec::new();
        for element in &elements {
            match element.text_content().await {
                Ok(Some(text)) => {
                    if let Some(value) = parse_bare_score(&text) {
                        candidates.push(value);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "unreadable score-tag element"),
            }
        }
        Ok(pick_pair(candidates))
    }
}

fn pick_pair(mut candidates: Vec<u32>) -> RawScores {
    if candidates.len() != 2 {
        return RawScores::default();
    }
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    RawScores {
        critic: Some(candidates[0]),
        audience: Some(candidates[1]),
    }
}

/// The tiers in the order they are tried.
#[must_use]
pub fn default_strategies(score_wait: Duration) -> Vec<Box<dyn ScoreStrategy>> {
    vec![
        Box::new(SlotSelectorStrategy { wait: score_wait }),
        Box::new(ScriptStrategy),
        Box::new(GenericScanStrategy),
    ]
}

/// First run of one to three digits in `text`.
#[must_use]
pub fn parse_score_text(text: &str) -> Option<u32> {
    FIRST_DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// A trimmed text that is nothing but a 1–3 digit number, optionally
/// followed by `%`, and within the score range.
fn parse_bare_score(text: &str) -> Option<u32> {
    BARE_PERCENT
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|value| in_score_range(*value))
}

fn in_score_range(value: u32) -> bool {
    value <= 100
}

/// Forces anything outside `0..=100` to `None`.
#[must_use]
pub fn sanitize_score(value: Option<u32>) -> Option<u8> {
    let value = value?;
    if in_score_range(value) {
        u8::try_from(value).ok()
    } else {
        tracing::debug!(value, "discarding out-of-range score");
        None
    }
}
