//! Weighted text prompts steering the generation service.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MELODY_PROMPT_ID: &str = "melody-prompt";
pub const MELODY_PROMPT_COLOR: &str = "#14b8a6";

/// Colors handed out to new prompts, in order of preference.
pub const PROMPT_COLORS: [&str; 8] = [
    "#9900ff", "#5200ff", "#ff25f6", "#2af6de", "#ffdd28", "#3dffab", "#d8ff3e", "#d9b2ff",
];

pub const PROMPT_TEXT_PRESETS: [&str; 16] = [
    "Bossa Nova",
    "Minimal Techno",
    "Drum and Bass",
    "Post Punk",
    "Shoegaze",
    "Funk",
    "Chiptune",
    "Lush Strings",
    "Sparkling Arpeggios",
    "Staccato Rhythms",
    "Punchy Kick",
    "Dubstep",
    "K Pop",
    "Neo Soul",
    "Trip Hop",
    "Thrash",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedPrompt {
    pub prompt_id: String,
    pub text: String,
    pub weight: f64,
    pub color: String,
}

impl WeightedPrompt {
    /// The prompt carrying a textual description of the user's melody.
    pub fn melody(text: impl Into<String>, weight: f64) -> Self {
        Self {
            prompt_id: MELODY_PROMPT_ID.to_string(),
            text: text.into(),
            weight,
            color: MELODY_PROMPT_COLOR.to_string(),
        }
    }
}

/// Ordered prompt collection plus the texts the service has filtered.
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    prompts: Vec<WeightedPrompt>,
    filtered: BTreeSet<String>,
    next_id: usize,
}

impl PromptBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the book with the first `count` preset texts, the first
    /// `active` of them at weight 1.
    pub fn with_presets(count: usize, active: usize) -> Self {
        let mut book = Self::new();
        for (i, text) in PROMPT_TEXT_PRESETS.iter().take(count).enumerate() {
            let id = book.add(*text).prompt_id.clone();
            if i < active {
                book.set_weight(&id, 1.0);
            }
        }
        book
    }

    /// Add a new zero-weight prompt with a fresh id and an unused color.
    pub fn add(&mut self, text: impl Into<String>) -> &WeightedPrompt {
        let color = PROMPT_COLORS
            .iter()
            .find(|c| !self.prompts.iter().any(|p| p.color == **c))
            .copied()
            .unwrap_or(PROMPT_COLORS[self.next_id % PROMPT_COLORS.len()]);
        let prompt = WeightedPrompt {
            prompt_id: format!("prompt-{}", self.next_id),
            text: text.into(),
            weight: 0.0,
            color: color.to_string(),
        };
        self.next_id += 1;
        self.prompts.push(prompt);
        &self.prompts[self.prompts.len() - 1]
    }

    /// Replace the prompt with the same id, or append it.
    pub fn upsert(&mut self, prompt: WeightedPrompt) {
        match self.prompts.iter_mut().find(|p| p.prompt_id == prompt.prompt_id) {
            Some(existing) => *existing = prompt,
            None => self.prompts.push(prompt),
        }
    }

    pub fn set_weight(&mut self, prompt_id: &str, weight: f64) -> bool {
        match self.prompts.iter_mut().find(|p| p.prompt_id == prompt_id) {
            Some(prompt) => {
                prompt.weight = weight;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, prompt_id: &str) -> Option<WeightedPrompt> {
        let index = self.prompts.iter().position(|p| p.prompt_id == prompt_id)?;
        Some(self.prompts.remove(index))
    }

    pub fn get(&self, prompt_id: &str) -> Option<&WeightedPrompt> {
        self.prompts.iter().find(|p| p.prompt_id == prompt_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightedPrompt> {
        self.prompts.iter()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Record a text rejected by the service. Returns false if already known.
    pub fn mark_filtered(&mut self, text: impl Into<String>) -> bool {
        self.filtered.insert(text.into())
    }

    pub fn is_filtered(&self, text: &str) -> bool {
        self.filtered.contains(text)
    }

    /// Prompts to send: neither filtered nor zero-weight, then the melody
    /// prompt if there is one.
    pub fn outgoing(&self, melody: Option<&WeightedPrompt>) -> Vec<WeightedPrompt> {
        self.prompts
            .iter()
            .filter(|p| !self.filtered.contains(&p.text) && p.weight != 0.0)
            .chain(melody)
            .cloned()
            .collect()
    }
}
