//! Capture session state: `Preview → Captured → AwaitingFilter → Filtered`.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use voca_webview::{ContentSink, ScreenState};

use crate::{alphabetic_words, FilteredWord, ImageRef, OcrError, OcrWord, TextRecognizer};

/// Where the current capture session sits.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    /// Camera preview showing, nothing captured.
    Preview,
    /// A photo was taken and recognized; raw words are the local preview list.
    Captured {
        image: ImageRef,
        words: Vec<OcrWord>,
    },
    /// Words were posted to the embedded content; waiting on `filteredWords`.
    /// There is no timeout here — only retake/close leave this state early.
    AwaitingFilter { image: ImageRef },
    /// The embedded content answered; these are the words to present.
    Filtered { words: Vec<FilteredWord> },
}

pub struct CaptureCoordinator {
    recognizer: Arc<dyn TextRecognizer>,
    state: Mutex<CaptureState>,
    /// `filteredWords` that arrived while no capture was awaiting them.
    stored_filtered: Mutex<Option<Vec<FilteredWord>>>,
}

impl CaptureCoordinator {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            state: Mutex::new(CaptureState::Preview),
            stored_filtered: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> CaptureState {
        self.state.lock().await.clone()
    }

    /// Run a captured image through recognition. Keeps only alphabetic
    /// words; returns them for the local preview listing.
    pub async fn capture(&self, image: ImageRef) -> Result<Vec<OcrWord>, OcrError> {
        let words = alphabetic_words(self.recognizer.recognize(&image).await?);
        info!(uri = %image.uri, count = words.len(), "capture recognized");
        *self.state.lock().await = CaptureState::Captured {
            image,
            words: words.clone(),
        };
        Ok(words)
    }

    /// Post the recognized words to the embedded content for dictionary
    /// filtering and move to `AwaitingFilter`. No-op unless a capture is
    /// sitting in `Captured`.
    pub async fn request_filter(&self, content: &dyn ContentSink) {
        let mut state = self.state.lock().await;
        let CaptureState::Captured { image, words } = &*state else {
            warn!("request_filter outside Captured state; ignoring");
            return;
        };
        // A leftover list from an earlier session must not satisfy this one.
        self.stored_filtered.lock().await.take();

        let message = json!({
            "type": "ocrResult",
            "words": words,
            "photoUri": image.uri,
            "photoSize": { "width": image.width, "height": image.height },
        });
        content.post(&message.to_string());
        debug!(count = words.len(), "posted ocrResult, awaiting filtered words");
        *state = CaptureState::AwaitingFilter {
            image: image.clone(),
        };
    }

    /// Router entry point for an inbound `filteredWords` list. Consumes it
    /// into `Filtered` when a capture is waiting; otherwise stores it.
    pub async fn deliver_filtered(&self, words: Vec<FilteredWord>) {
        let mut state = self.state.lock().await;
        if matches!(&*state, CaptureState::AwaitingFilter { .. }) {
            info!(count = words.len(), "filtered words received");
            *state = CaptureState::Filtered { words };
        } else {
            debug!(
                count = words.len(),
                "filtered words with no capture awaiting; storing"
            );
            *self.stored_filtered.lock().await = Some(words);
        }
    }

    /// Take a stored filtered-word list that arrived outside a round trip.
    pub async fn take_stored_filtered(&self) -> Option<Vec<FilteredWord>> {
        self.stored_filtered.lock().await.take()
    }

    /// Back to the camera preview, dropping all pending filter state. Valid
    /// from any state.
    pub async fn retake(&self) {
        *self.state.lock().await = CaptureState::Preview;
        self.stored_filtered.lock().await.take();
    }

    /// Tear the capture surface down and clear the shared OCR-active flag.
    pub async fn close(&self, screen: &dyn ScreenState) {
        self.retake().await;
        screen.set_ocr_active(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundingBox;
    use async_trait::async_trait;
    use voca_webview::test_support::{FlagScreen, RecordingSink};

    struct FixedRecognizer(Vec<OcrWord>);

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        async fn recognize(&self, _image: &ImageRef) -> Result<Vec<OcrWord>, OcrError> {
            Ok(self.0.clone())
        }
    }

    fn word(text: &str) -> OcrWord {
        OcrWord {
            text: text.into(),
            bounding_box: BoundingBox {
                left: 1.0,
                top: 2.0,
                width: 30.0,
                height: 10.0,
            },
        }
    }

    fn image() -> ImageRef {
        ImageRef {
            uri: "file:///tmp/capture.jpg".into(),
            width: 3024,
            height: 4032,
        }
    }

    fn filtered(id: i64, text: &str) -> FilteredWord {
        FilteredWord {
            word_id: id,
            word: text.into(),
            meanings: vec![],
        }
    }

    fn coordinator(words: Vec<OcrWord>) -> CaptureCoordinator {
        CaptureCoordinator::new(Arc::new(FixedRecognizer(words)))
    }

    #[tokio::test]
    async fn full_round_trip_presents_filtered_words() {
        let coord = coordinator(vec![word("apple"), word("banana"), word("cherry")]);
        let sink = RecordingSink::new();

        let preview = coord.capture(image()).await.unwrap();
        assert_eq!(preview.len(), 3);

        coord.request_filter(&sink).await;
        let posted = &sink.posted_json()[0];
        assert_eq!(posted["type"], "ocrResult");
        assert_eq!(posted["words"].as_array().unwrap().len(), 3);
        assert_eq!(posted["words"][0]["text"], "apple");
        assert_eq!(posted["words"][0]["boundingBox"]["left"], 1.0);
        assert_eq!(posted["photoUri"], "file:///tmp/capture.jpg");
        assert_eq!(posted["photoSize"]["width"], 3024);

        coord
            .deliver_filtered(vec![filtered(1, "apple"), filtered(2, "banana")])
            .await;
        match coord.state().await {
            CaptureState::Filtered { words } => {
                // The two filtered entries, not the three raw ones.
                assert_eq!(words.len(), 2);
                assert_eq!(words[0].word, "apple");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn recognizer_output_is_filtered_to_alphabetic() {
        let coord = coordinator(vec![word("apple"), word("42"), word("x-ray")]);
        let preview = coord.capture(image()).await.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].text, "apple");
    }

    #[tokio::test]
    async fn filtered_words_without_pending_capture_are_stored() {
        let coord = coordinator(vec![]);
        coord.deliver_filtered(vec![filtered(7, "stray")]).await;

        assert_eq!(coord.state().await, CaptureState::Preview);
        let stored = coord.take_stored_filtered().await.unwrap();
        assert_eq!(stored[0].word, "stray");
        assert!(coord.take_stored_filtered().await.is_none());
    }

    #[tokio::test]
    async fn request_filter_clears_stale_stored_list() {
        let coord = coordinator(vec![word("apple")]);
        let sink = RecordingSink::new();

        coord.deliver_filtered(vec![filtered(9, "stale")]).await;
        coord.capture(image()).await.unwrap();
        coord.request_filter(&sink).await;

        assert!(coord.take_stored_filtered().await.is_none());
        assert!(matches!(
            coord.state().await,
            CaptureState::AwaitingFilter { .. }
        ));
    }

    #[tokio::test]
    async fn retake_resets_from_any_state() {
        let coord = coordinator(vec![word("apple")]);
        let sink = RecordingSink::new();

        coord.capture(image()).await.unwrap();
        coord.request_filter(&sink).await;
        coord.retake().await;
        assert_eq!(coord.state().await, CaptureState::Preview);

        // A reply landing after retake does not resurrect the session.
        coord.deliver_filtered(vec![filtered(1, "late")]).await;
        assert_eq!(coord.state().await, CaptureState::Preview);
    }

    #[tokio::test]
    async fn close_clears_screen_flag() {
        let coord = coordinator(vec![word("apple")]);
        let screen = FlagScreen::new();
        screen.set_ocr_active(true);

        coord.capture(image()).await.unwrap();
        coord.close(&screen).await;

        assert!(!screen.ocr_active());
        assert_eq!(coord.state().await, CaptureState::Preview);
    }

    #[tokio::test]
    async fn request_filter_requires_a_capture() {
        let coord = coordinator(vec![]);
        let sink = RecordingSink::new();
        coord.request_filter(&sink).await;
        assert!(sink.posted().is_empty());
        assert_eq!(coord.state().await, CaptureState::Preview);
    }
}
