//! Document-to-speech segmentation and synchronization engine
//!
//! The core of PageVox: walks an untrusted document tree into an ordered
//! stream of speakable segments, synthesizes the spoken buffer with a
//! byte-exact position map back to the displayed text, and drives a speech
//! engine through a resumable, interruptible playback state machine with
//! synchronized highlighting and heading/abbreviation navigation.

pub mod annotation;
pub mod config;
pub mod error;
pub mod highlight;
pub mod language;
pub mod normalize;
pub mod playback;
pub mod segment;
pub mod spoken;

pub use annotation::{Annotation, AnnotationKind, EmphasisLevel};
pub use config::ReaderConfig;
pub use error::{ReaderError, ReaderResult};
pub use highlight::HighlightCommand;
pub use language::{detect_language, DocLanguage};
pub use playback::{PlaybackState, ReaderSession};
pub use segment::{
    BuildProgress, NavEntry, Segment, SegmentBuilder, SegmentKind, SpeakableStream,
};
pub use spoken::SpokenBuffer;
