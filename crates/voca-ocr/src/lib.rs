//! Camera text capture and the filter round trip.
//!
//! A capture runs through the platform text recognizer, the alphabetic
//! word list goes to the embedded content as `ocrResult`, and the content
//! answers with `filteredWords` once it has looked the words up. The
//! coordinator tracks where one capture session sits in that exchange.

mod coordinator;
mod recognize;
mod types;

pub use coordinator::{CaptureCoordinator, CaptureState};
pub use recognize::{alphabetic_words, OcrError, TextRecognizer};
pub use types::{BoundingBox, FilteredWord, ImageRef, OcrWord};
