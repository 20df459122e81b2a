use kuchiki::NodeRef;
use tracing::{debug, info};

use super::document::attribute;
use super::materializer::BlobRegistry;

/// Where playback actually happens. The frame only decides *when*.
pub trait MediaBackend {
    fn play(&mut self, media: &NodeRef);
}

/// Backend that only records playback in the log.
#[derive(Debug, Default)]
pub struct TracingMediaBackend;

impl MediaBackend for TracingMediaBackend {
    fn play(&mut self, media: &NodeRef) {
        info!(
            target = "playback",
            src = %attribute(media, "src").unwrap_or_default(),
            "playing media"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    AwaitingReady(usize),
    Playing(usize),
    Finished,
}

/// Plays a list of media elements back to back.
///
/// Element `i` starts only after element `i - 1` ended, and only once it is
/// loadable: its `src` is a live handle, it signalled `canplay`, or a handle
/// was just applied to it.
pub struct PlaybackController {
    queue: Vec<NodeRef>,
    can_play: Vec<bool>,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(queue: Vec<NodeRef>) -> Self {
        let can_play = vec![false; queue.len()];
        Self {
            queue,
            can_play,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn start(&mut self, blobs: &BlobRegistry, backend: &mut dyn MediaBackend) {
        if self.state != PlaybackState::Idle {
            return;
        }
        self.advance_to(0, blobs, backend);
    }

    pub fn on_can_play(&mut self, media: &NodeRef, backend: &mut dyn MediaBackend) {
        let Some(index) = self.position(media) else {
            return;
        };
        self.can_play[index] = true;
        if self.state == PlaybackState::AwaitingReady(index) {
            self.play(index, backend);
        }
    }

    /// The materializer just pointed `media` at a handle.
    pub fn on_handle_applied(&mut self, media: &NodeRef, backend: &mut dyn MediaBackend) {
        if let PlaybackState::AwaitingReady(index) = self.state {
            if self.queue[index] == *media {
                self.play(index, backend);
            }
        }
    }

    pub fn on_ended(
        &mut self,
        media: &NodeRef,
        blobs: &BlobRegistry,
        backend: &mut dyn MediaBackend,
    ) {
        if let PlaybackState::Playing(index) = self.state {
            if self.queue[index] == *media {
                self.advance_to(index + 1, blobs, backend);
            }
        }
    }

    fn advance_to(&mut self, index: usize, blobs: &BlobRegistry, backend: &mut dyn MediaBackend) {
        if index >= self.queue.len() {
            self.state = PlaybackState::Finished;
            debug!(target = "playback", count = self.queue.len(), "playback finished");
            return;
        }
        let materialized = attribute(&self.queue[index], "src")
            .map(|src| blobs.contains(&src))
            .unwrap_or(false);
        if materialized || self.can_play[index] {
            self.play(index, backend);
        } else {
            debug!(target = "playback", index, "waiting for media to become playable");
            self.state = PlaybackState::AwaitingReady(index);
        }
    }

    fn play(&mut self, index: usize, backend: &mut dyn MediaBackend) {
        self.state = PlaybackState::Playing(index);
        backend.play(&self.queue[index]);
    }

    fn position(&self, media: &NodeRef) -> Option<usize> {
        self.queue.iter().position(|candidate| candidate == media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::document::{set_attribute, CardDocument};

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl MediaBackend for Recorder {
        fn play(&mut self, media: &NodeRef) {
            self.0.push(attribute(media, "id").unwrap_or_default());
        }
    }

    fn audio(html: &str) -> Vec<NodeRef> {
        CardDocument::parse(html).elements_by_tag("audio")
    }

    #[test]
    fn empty_queue_finishes_immediately() {
        let mut controller = PlaybackController::new(Vec::new());
        let mut backend = Recorder::default();
        controller.start(&BlobRegistry::new("null"), &mut backend);
        assert_eq!(controller.state(), PlaybackState::Finished);
        assert!(backend.0.is_empty());
    }

    #[test]
    fn materialized_source_plays_without_waiting() {
        let mut blobs = BlobRegistry::new("null");
        let handle = blobs.create("audio/mpeg", vec![0]);
        let media = audio(r#"<audio id="m1" src="x.mp3"></audio>"#);
        set_attribute(&media[0], "src", &handle);

        let mut controller = PlaybackController::new(media.clone());
        let mut backend = Recorder::default();
        controller.start(&blobs, &mut backend);
        assert_eq!(backend.0, vec!["m1"]);

        controller.on_ended(&media[0], &blobs, &mut backend);
        assert_eq!(controller.state(), PlaybackState::Finished);
    }

    #[test]
    fn chain_waits_for_ready_and_for_previous_end() {
        let blobs = BlobRegistry::new("null");
        let media = audio(
            r#"<audio id="m1" src="1.mp3"></audio><audio id="m2" src="2.mp3"></audio><audio id="m3" src="3.mp3"></audio>"#,
        );
        let mut controller = PlaybackController::new(media.clone());
        let mut backend = Recorder::default();

        controller.start(&blobs, &mut backend);
        assert!(backend.0.is_empty(), "m1 must wait for its readiness");
        assert_eq!(controller.state(), PlaybackState::AwaitingReady(0));

        controller.on_can_play(&media[1], &mut backend);
        assert!(backend.0.is_empty(), "m2 being ready does not skip m1");

        controller.on_can_play(&media[0], &mut backend);
        assert_eq!(backend.0, vec!["m1"]);

        controller.on_ended(&media[1], &blobs, &mut backend);
        assert_eq!(backend.0, vec!["m1"], "ended from a non-playing element is ignored");

        controller.on_ended(&media[0], &blobs, &mut backend);
        assert_eq!(backend.0, vec!["m1", "m2"], "m2 was already ready");

        controller.on_ended(&media[1], &blobs, &mut backend);
        assert_eq!(controller.state(), PlaybackState::AwaitingReady(2));
        controller.on_handle_applied(&media[2], &mut backend);
        assert_eq!(backend.0, vec!["m1", "m2", "m3"]);
    }
}
