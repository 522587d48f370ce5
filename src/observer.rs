use std::time::{Duration, Instant};

use crate::capture::{CaptureError, DisplaySink, EmotionDetector, FrameSource};
use crate::emotion::{Emotion, EmotionSample, EmotionWindow};

/// Summary of one observation run.
#[derive(Debug)]
pub struct Observation {
    /// Majority emotion across the window, `None` when no face was ever seen.
    pub majority: Option<Emotion>,
    /// Frames pulled from the source, with or without a face.
    pub frames_seen: u64,
    /// Frames that contributed a sample.
    pub samples: usize,
    /// Sample count per label, indexed in canonical order.
    pub counts: [usize; Emotion::COUNT],
    pub elapsed: Duration,
}

/// Sample emotions from `source` for `duration` of wall-clock time and reduce
/// the window to one majority label.
///
/// The deadline is checked between frames, never mid-frame, so the run can
/// overshoot by up to one frame's processing latency. A duration too large
/// for the clock to represent is treated as unbounded. A source that runs
/// dry before the deadline ends the window early with whatever was
/// collected; that is a normal outcome, not an error. Frames without a face
/// contribute no sample. Display forwarding is fire-and-forget: sink
/// failures are logged at debug level and swallowed.
pub fn observe(
    source: &mut impl FrameSource,
    detector: &mut impl EmotionDetector,
    mut display: Option<&mut dyn DisplaySink>,
    duration: Duration,
) -> Result<Observation, CaptureError> {
    let started = Instant::now();
    // Overflowing the clock means no deadline; the source running dry still
    // ends the loop.
    let deadline = started.checked_add(duration);
    let mut window = EmotionWindow::new();
    let mut frames_seen: u64 = 0;

    while deadline.is_none_or(|deadline| Instant::now() < deadline) {
        let Some(frame) = source.next_frame()? else {
            log::debug!("Frame source closed after {frames_seen} frames");
            break;
        };
        frames_seen += 1;

        let detection = detector.detect(&frame)?;

        if let Some(sink) = display.as_deref_mut() {
            let face = detection.as_ref().map(|d| &d.face);
            if let Err(e) = sink.show(&frame, face) {
                log::debug!("Display sink failed on frame {}: {e}", frame.index);
            }
        }

        if let Some(detection) = detection {
            let (emotion, _) = detection.scores.dominant();
            window.push(EmotionSample {
                emotion,
                scores: detection.scores,
                face: detection.face,
            });
        }
    }

    Ok(Observation {
        majority: window.majority(),
        frames_seen,
        samples: window.len(),
        counts: window.counts(),
        elapsed: started.elapsed(),
    })
}
