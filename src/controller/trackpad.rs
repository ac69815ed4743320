use tracing::{debug, warn};

use super::MessageSink;
use crate::gesture::{
    GestureError, GestureMode, GestureSettings, TouchPoint, TouchSample, TrackpadGesture,
};
use crate::protocol::ControlMessage;
use crate::transport::LinkStatus;

/// Phase of a touch batch as delivered by the input surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// Trackpad surface: one gesture machine and its own socket
pub struct TrackpadController<S: MessageSink> {
    gesture: TrackpadGesture,
    sink: S,
    sent: u64,
    dropped: u64,
}

impl<S: MessageSink> TrackpadController<S> {
    pub fn new(settings: GestureSettings, sink: S) -> Self {
        debug!("Creating trackpad controller with {:?}", settings);
        Self {
            gesture: TrackpadGesture::new(settings),
            sink,
            sent: 0,
            dropped: 0,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.gesture.mode()
    }

    pub fn is_clicking(&self) -> bool {
        self.gesture.is_clicking()
    }

    pub fn points(&self) -> Vec<TouchPoint> {
        self.gesture.points()
    }

    pub fn link_status(&self) -> LinkStatus {
        self.sink.status()
    }

    /// Messages accepted and dropped by the sink so far
    pub fn counters(&self) -> (u64, u64) {
        (self.sent, self.dropped)
    }

    pub fn touch_start(&mut self, samples: &[TouchSample]) {
        let result = self.gesture.touch_start(samples);
        self.dispatch("start", result);
    }

    pub fn touch_move(&mut self, samples: &[TouchSample]) {
        let result = self.gesture.touch_move(samples);
        self.dispatch("move", result);
    }

    pub fn touch_end(&mut self, samples: &[TouchSample]) {
        let result = self.gesture.touch_end(samples);
        self.dispatch("end", result);
    }

    pub fn touch_cancel(&mut self, samples: &[TouchSample]) {
        let result = self.gesture.touch_cancel(samples);
        self.dispatch("cancel", result);
    }

    pub fn force_change(&mut self, samples: &[TouchSample]) {
        let result = self.gesture.force_change(samples);
        self.dispatch("force", result);
    }

    /// Routes one batch by phase, feeding forces after positions
    pub fn handle(&mut self, phase: TouchPhase, samples: &[TouchSample]) {
        if samples.is_empty() {
            return;
        }
        match phase {
            TouchPhase::Start => self.touch_start(samples),
            TouchPhase::Move => self.touch_move(samples),
            TouchPhase::End => self.touch_end(samples),
            TouchPhase::Cancel => self.touch_cancel(samples),
        }
        if matches!(phase, TouchPhase::Start | TouchPhase::Move)
            && samples.iter().any(|sample| sample.force.is_some())
        {
            self.force_change(samples);
        }
    }

    fn dispatch(&mut self, event: &str, result: Result<Vec<ControlMessage>, GestureError>) {
        match result {
            Ok(messages) => {
                for message in messages {
                    if self.sink.send(message) {
                        self.sent += 1;
                    } else {
                        self.dropped += 1;
                    }
                }
            }
            Err(e) => warn!("Dropping touch {} event: {}", event, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::RecordingSink;

    fn controller() -> (TrackpadController<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::online();
        (
            TrackpadController::new(GestureSettings::default(), sink.clone()),
            sink,
        )
    }

    #[test]
    fn pointer_path_reaches_the_sink_in_order() {
        let (mut pad, sink) = controller();
        pad.handle(TouchPhase::Start, &[TouchSample::new(1, 0.0, 0.0)]);
        pad.handle(TouchPhase::Move, &[TouchSample::new(1, 10.0, 0.0)]);
        pad.handle(
            TouchPhase::Move,
            &[TouchSample::new(1, 10.0, 0.0).with_force(0.5)],
        );
        pad.handle(TouchPhase::End, &[TouchSample::new(1, 10.0, 0.0)]);
        assert_eq!(
            sink.take(),
            vec![
                ControlMessage::Move { dx: 18, dy: 0 },
                ControlMessage::Move { dx: 0, dy: 0 },
                ControlMessage::ButtonDown,
                ControlMessage::Move { dx: 0, dy: 0 },
                ControlMessage::ButtonUp,
            ]
        );
        assert_eq!(pad.counters(), (5, 0));
        assert_eq!(pad.mode(), GestureMode::Idle);
    }

    #[test]
    fn gesture_errors_are_dropped_without_output() {
        let (mut pad, sink) = controller();
        pad.handle(TouchPhase::Move, &[TouchSample::new(9, 1.0, 1.0)]);
        pad.handle(TouchPhase::Start, &[TouchSample::new(1, 0.0, 0.0)]);
        pad.handle(TouchPhase::Start, &[TouchSample::new(1, 0.0, 0.0)]);
        assert!(sink.take().is_empty());
        assert_eq!(pad.mode(), GestureMode::Pointer);
    }

    #[test]
    fn offline_sink_counts_drops() {
        let sink = RecordingSink {
            online: false,
            ..RecordingSink::online()
        };
        let mut pad = TrackpadController::new(GestureSettings::default(), sink);
        pad.handle(TouchPhase::Start, &[TouchSample::new(1, 0.0, 0.0)]);
        pad.handle(TouchPhase::Move, &[TouchSample::new(1, 1.0, 0.0)]);
        assert_eq!(pad.counters(), (0, 1));
        assert_eq!(pad.link_status(), LinkStatus::Closed);
    }
}
