use serde::{Deserialize, Serialize};

/// Shared material for one round: the image the describer studies and the hint
/// later revealed to the interrogator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContent {
    pub image: String,
    pub hint: String,
}

impl RoundContent {
    pub fn new(image: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            hint: hint.into(),
        }
    }
}

/// Source of round content for a pair.
pub trait ContentCatalog: Send + Sync {
    fn select(&self, first: &str, second: &str) -> RoundContent;
}

/// Fixed list of rounds. Selection depends only on the pair's names, never on
/// call direction or chance.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    entries: Vec<RoundContent>,
}

impl StaticCatalog {
    pub fn new(first: RoundContent) -> Self {
        Self {
            entries: vec![first],
        }
    }

    pub fn with_entry(mut self, entry: RoundContent) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(RoundContent::new("./img/Hat.png", "article of clothing"))
    }
}

impl ContentCatalog for StaticCatalog {
    fn select(&self, first: &str, second: &str) -> RoundContent {
        let (low, high) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        let seed = low
            .bytes()
            .chain(std::iter::once(0))
            .chain(high.bytes())
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));

        self.entries[seed % self.entries.len()].clone()
    }
}
