//! Text recognition capability contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::{ImageRef, OcrWord};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("camera capture failed: {0}")]
    Capture(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Platform text recognizer: one finished image in, raw word fragments out.
/// One-shot per image, not restartable.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &ImageRef) -> Result<Vec<OcrWord>, OcrError>;
}

/// Keep only purely alphabetic tokens; everything else is dropped without
/// being reported. Applied to every recognizer result before use.
pub fn alphabetic_words(words: Vec<OcrWord>) -> Vec<OcrWord> {
    words
        .into_iter()
        .filter(|w| !w.text.is_empty() && w.text.chars().all(|c| c.is_ascii_alphabetic()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundingBox;

    fn word(text: &str) -> OcrWord {
        OcrWord {
            text: text.into(),
            bounding_box: BoundingBox::default(),
        }
    }

    #[test]
    fn filter_drops_non_alphabetic_tokens() {
        let words = vec![
            word("apple"),
            word("3rd"),
            word("vocabulary"),
            word("co-op"),
            word(""),
            word("été"),
        ];
        let kept: Vec<_> = alphabetic_words(words)
            .into_iter()
            .map(|w| w.text)
            .collect();
        assert_eq!(kept, vec!["apple", "vocabulary"]);
    }
}
