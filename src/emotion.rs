use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed emotion vocabulary, in canonical order.
///
/// Declaration order is load-bearing: every tie in the pipeline (dominant
/// label within a frame, majority vote across a window) resolves to the
/// variant listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Neutral,
    Surprise,
    Fear,
    Disgust,
}

impl Emotion {
    /// All labels in canonical (tie-break) order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Neutral,
        Emotion::Surprise,
        Emotion::Fear,
        Emotion::Disgust,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Neutral => "neutral",
            Emotion::Surprise => "surprise",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unknown emotion label \"{0}\"")]
pub struct UnknownEmotion(String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            "neutral" => Ok(Emotion::Neutral),
            "surprise" => Ok(Emotion::Surprise),
            "fear" => Ok(Emotion::Fear),
            "disgust" => Ok(Emotion::Disgust),
            _ => Err(UnknownEmotion(s.to_string())),
        }
    }
}

/// Per-label confidence for one frame. Scores are not required to sum to 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionScores([f32; Emotion::COUNT]);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Emotion, f32)>) -> Self {
        let mut scores = Self::new();
        for (emotion, score) in pairs {
            scores.set(emotion, score);
        }
        scores
    }

    pub fn set(&mut self, emotion: Emotion, score: f32) {
        self.0[emotion.index()] = score;
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.0[emotion.index()]
    }

    /// Label with the highest confidence. Ties go to the label earliest in
    /// canonical order, regardless of insertion order.
    pub fn dominant(&self) -> (Emotion, f32) {
        let mut best = Emotion::ALL[0];
        for &emotion in &Emotion::ALL[1..] {
            if self.get(emotion) > self.get(best) {
                best = emotion;
            }
        }
        (best, self.get(best))
    }
}

/// Face bounding box in frame pixel coordinates. Detectors may report
/// negative origins for faces clipped by the frame edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One classified frame: the dominant label plus the full score map.
#[derive(Debug, Clone)]
pub struct EmotionSample {
    pub emotion: Emotion,
    pub scores: EmotionScores,
    pub face: FaceBox,
}

/// An in-order collection of samples from a single observation run.
#[derive(Debug, Default)]
pub struct EmotionWindow {
    samples: Vec<EmotionSample>,
}

impl EmotionWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: EmotionSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[EmotionSample] {
        &self.samples
    }

    /// Occurrence count per label, indexed in canonical order.
    pub fn counts(&self) -> [usize; Emotion::COUNT] {
        let mut counts = [0usize; Emotion::COUNT];
        for sample in &self.samples {
            counts[sample.emotion.index()] += 1;
        }
        counts
    }

    /// Most frequent label across the window, or `None` for an empty window
    /// (the "undetermined" outcome). Ties go to the label earliest in
    /// canonical order.
    pub fn majority(&self) -> Option<Emotion> {
        if self.samples.is_empty() {
            return None;
        }
        let counts = self.counts();
        let mut best = Emotion::ALL[0];
        for &emotion in &Emotion::ALL[1..] {
            if counts[emotion.index()] > counts[best.index()] {
                best = emotion;
            }
        }
        Some(best)
    }
}
