use std::collections::BTreeMap;
use std::io::BufRead;

use serde::Deserialize;
use thiserror::Error;

use crate::emotion::{Emotion, EmotionScores, FaceBox};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("frame source failed: {0}")]
    Source(String),

    #[error("detector failed: {0}")]
    Detector(String),

    #[error("capture log line {line}: {message}")]
    Replay { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One raw frame pulled from a capture device. Replayed frames carry no
/// pixel data, only the sequence index.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Produces frames on demand. `Ok(None)` means the device closed or the
/// stream ran out; callers treat that as a normal end of input, not a failure.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// One classifier hit on one frame.
#[derive(Debug, Clone)]
pub struct Detection {
    pub scores: EmotionScores,
    pub face: FaceBox,
}

/// Classifies a single frame. `Ok(None)` is the explicit no-face outcome;
/// implementations must return it (not an error) for frames with nothing to
/// classify.
pub trait EmotionDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, CaptureError>;
}

/// Side channel for live feedback. Failures here never abort an observation;
/// the caller logs and keeps going.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame, face: Option<&FaceBox>) -> Result<(), CaptureError>;
}

/// One line of a JSONL capture log, as written by an external detector
/// process. `face: null` (or absent) records a no-face frame. Score keys
/// outside the emotion vocabulary are a parse error; absent labels score 0.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[allow(dead_code)]
    #[serde(default)]
    frame: Option<u64>,
    #[serde(default)]
    face: Option<FaceBox>,
    #[serde(default)]
    scores: BTreeMap<Emotion, f32>,
}

impl ReplayRecord {
    fn into_detection(self) -> Option<Detection> {
        let face = self.face?;
        Some(Detection {
            scores: EmotionScores::from_pairs(self.scores),
            face,
        })
    }
}

/// A parsed capture log, replayable through the same trait boundary a live
/// camera and classifier would use.
#[derive(Debug)]
pub struct ReplayLog {
    records: Vec<Option<Detection>>,
}

impl ReplayLog {
    pub fn read(reader: impl BufRead) -> Result<Self, CaptureError> {
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: ReplayRecord =
                serde_json::from_str(trimmed).map_err(|e| CaptureError::Replay {
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            records.push(record.into_detection());
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split the log into the two halves of the capture boundary: a frame
    /// source that yields one frame per logged line, and a detector that
    /// looks results up by frame index.
    pub fn into_parts(self) -> (ReplayFrames, ReplayDetector) {
        let total = self.records.len() as u64;
        (
            ReplayFrames { next: 0, total },
            ReplayDetector { detections: self.records },
        )
    }
}

#[derive(Debug)]
pub struct ReplayFrames {
    next: u64,
    total: u64,
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.next >= self.total {
            return Ok(None);
        }
        let frame = Frame { index: self.next, ..Frame::default() };
        self.next += 1;
        Ok(Some(frame))
    }
}

#[derive(Debug)]
pub struct ReplayDetector {
    detections: Vec<Option<Detection>>,
}

impl EmotionDetector for ReplayDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, CaptureError> {
        Ok(self.detections.get(frame.index as usize).cloned().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_record_with_face_and_scores() {
        let line = r#"{"frame": 0, "face": {"x": 10, "y": 20, "width": 100, "height": 120}, "scores": {"happy": 0.8, "sad": 0.1}}"#;
        let log = ReplayLog::read(Cursor::new(line)).unwrap();
        assert_eq!(log.len(), 1);

        let (_, mut detector) = log.into_parts();
        let detection = detector
            .detect(&Frame { index: 0, ..Frame::default() })
            .unwrap()
            .unwrap();
        assert_eq!(detection.face.x, 10);
        assert_eq!(detection.face.height, 120);
        assert_eq!(detection.scores.dominant().0, Emotion::Happy);
        // Absent labels default to zero
        assert_eq!(detection.scores.get(Emotion::Fear), 0.0);
    }

    #[test]
    fn test_read_no_face_line() {
        let input = "{\"face\": null}\n{}\n";
        let log = ReplayLog::read(Cursor::new(input)).unwrap();
        assert_eq!(log.len(), 2);

        let (_, mut detector) = log.into_parts();
        for index in 0..2 {
            let detection = detector
                .detect(&Frame { index, ..Frame::default() })
                .unwrap();
            assert!(detection.is_none());
        }
    }

    #[test]
    fn test_read_rejects_unknown_score_label() {
        let line = r#"{"face": {"x": 0, "y": 0, "width": 1, "height": 1}, "scores": {"joyful": 1.0}}"#;
        let err = ReplayLog::read(Cursor::new(line)).unwrap_err();
        match err {
            CaptureError::Replay { line, .. } => assert_eq!(line, 1),
            other => panic!("expected replay error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_reports_line_numbers_past_blanks() {
        let input = "\n{\"face\": null}\n\nnot json\n";
        let err = ReplayLog::read(Cursor::new(input)).unwrap_err();
        match err {
            CaptureError::Replay { line, .. } => assert_eq!(line, 4),
            other => panic!("expected replay error, got {other:?}"),
        }
    }

    #[test]
    fn test_replay_frames_end_with_none() {
        let input = "{\"face\": null}\n{\"face\": null}\n";
        let (mut frames, _) = ReplayLog::read(Cursor::new(input)).unwrap().into_parts();

        assert_eq!(frames.next_frame().unwrap().unwrap().index, 0);
        assert_eq!(frames.next_frame().unwrap().unwrap().index, 1);
        assert!(frames.next_frame().unwrap().is_none());
        assert!(frames.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_face_without_scores_is_all_zero_detection() {
        let line = r#"{"face": {"x": 0, "y": 0, "width": 32, "height": 32}}"#;
        let (_, mut detector) = ReplayLog::read(Cursor::new(line)).unwrap().into_parts();
        let detection = detector
            .detect(&Frame { index: 0, ..Frame::default() })
            .unwrap()
            .unwrap();
        assert_eq!(detection.scores, EmotionScores::new());
    }
}
