use std::slice;

use kuchiki::traits::*;
use kuchiki::NodeRef;
use serde_json::Value as JsonValue;
use tracing::{debug, trace, warn};

use super::answers::{extract_form_values, restore_typed_answers};
use super::bootstrap::FrameBootstrap;
use super::document::{attribute, create_element, set_attribute, CardDocument, ReadyState};
use super::event_loop::{run_turn, EventLoopContext, TaskQueue};
use super::ledger::{key_for_node, FailureOutcome, ResourceLedger};
use super::materializer::{BlobRegistry, Materializer};
use super::playback::{MediaBackend, PlaybackController, PlaybackState, TracingMediaBackend};
use super::ready::{self, ReadyContext, ReadyGate};
use crate::config::FrameConfig;
use crate::protocol::{ChannelEnd, Envelope, Message, ResourceResponse};

/// Receives inbound envelopes of kinds the frame does not know.
pub type ExtensionHook = Box<dyn FnMut(&str, &JsonValue)>;

/// Mirrors `event.defaultPrevented` for a submit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// Not intercepted; the browser would navigate.
    Default,
    /// Relayed to the host as `answer-submit`.
    Intercepted,
}

/// One sandboxed rendering context and everything it owns.
///
/// All state lives here rather than in globals, so dropping the frame tears
/// down its ledger, handles and pending callbacks.
pub struct Frame {
    context_id: String,
    config: FrameConfig,
    bootstrap: Option<FrameBootstrap>,
    document: CardDocument,
    ledger: ResourceLedger,
    materializer: Materializer,
    tasks: TaskQueue<Frame>,
    gate: ReadyGate<Frame>,
    channel: ChannelEnd,
    playback: Option<PlaybackController>,
    media: Box<dyn MediaBackend>,
    extension: Option<ExtensionHook>,
    submit_bound: bool,
}

impl EventLoopContext for Frame {
    fn tasks(&mut self) -> &mut TaskQueue<Self> {
        &mut self.tasks
    }
}

impl ReadyContext for Frame {
    fn ready_gate(&mut self) -> &mut ReadyGate<Self> {
        &mut self.gate
    }

    fn document_is_ready(&self) -> bool {
        self.document.ready_state() != ReadyState::Loading
    }
}

impl Frame {
    pub fn new(
        context_id: impl Into<String>,
        config: &FrameConfig,
        html: &str,
        channel: ChannelEnd,
    ) -> Self {
        let document = CardDocument::parse(html);
        let bootstrap = match FrameBootstrap::from_document(&document) {
            Ok(bootstrap) => bootstrap,
            Err(err) => {
                warn!(target = "frame", error = %err, "ignoring unreadable bootstrap");
                None
            }
        };

        let mut frame = Self {
            context_id: context_id.into(),
            config: config.clone(),
            bootstrap,
            document,
            ledger: ResourceLedger::new(),
            materializer: Materializer::new(config.handle_origin.clone()),
            tasks: TaskQueue::new(),
            gate: ReadyGate::new(),
            channel,
            playback: None,
            media: Box::new(TracingMediaBackend),
            extension: None,
            submit_bound: false,
        };
        frame.on_ready(Frame::install_card_behaviour);
        frame
    }

    pub fn with_bootstrap(mut self, bootstrap: FrameBootstrap) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    pub fn with_media_backend(mut self, backend: impl MediaBackend + 'static) -> Self {
        self.media = Box::new(backend);
        self
    }

    pub fn set_extension_hook(&mut self, hook: impl FnMut(&str, &JsonValue) + 'static) {
        self.extension = Some(Box::new(hook));
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn document(&self) -> &CardDocument {
        &self.document
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn blobs(&self) -> &BlobRegistry {
        self.materializer.blobs()
    }

    pub fn bootstrap(&self) -> Option<&FrameBootstrap> {
        self.bootstrap.as_ref()
    }

    pub fn playback_state(&self) -> Option<PlaybackState> {
        self.playback.as_ref().map(PlaybackController::state)
    }

    pub fn is_ready(&self) -> bool {
        self.gate.has_fired()
    }

    /// Run `callback` once the document is ready; never synchronously.
    pub fn on_ready(&mut self, callback: impl FnOnce(&mut Frame) + 'static) {
        ready::on_ready(self, Box::new(callback));
    }

    /// `DOMContentLoaded`: the document is interactive.
    pub fn document_loaded(&mut self) {
        if self.document.ready_state() == ReadyState::Loading {
            self.document.set_ready_state(ReadyState::Interactive);
        }
        ready::fire(self);
    }

    /// `load`: every subresource has settled. Fires the gate if
    /// `DOMContentLoaded` was never delivered.
    pub fn load_complete(&mut self) {
        self.document.set_ready_state(ReadyState::Complete);
        ready::fire(self);
    }

    /// A DOM node failed to load its `src`/`href`.
    ///
    /// Returns false when the event is not a resource failure the ledger
    /// handles.
    pub fn load_failed(&mut self, node: &NodeRef) -> bool {
        let Some(key) = key_for_node(node) else {
            trace!(target = "frame", "error event without a resource reference");
            return false;
        };
        if self.materializer.blobs().contains(&key.path) {
            warn!(target = "ledger", key = %key, "materialized handle failed to load; not re-requesting");
            return false;
        }

        let kind = key.element_kind;
        match self.ledger.record_failure(key, node.clone()) {
            FailureOutcome::Request(key) => {
                debug!(target = "ledger", key = %key, "requesting resource from host");
                self.send(Message::ResourceRequest(key));
            }
            FailureOutcome::Queued => {
                trace!(target = "ledger", "request already outstanding; node queued");
            }
            FailureOutcome::Resolved(handle) => {
                Materializer::apply(kind, &handle, slice::from_ref(node));
                self.notify_handle_applied(slice::from_ref(node));
            }
        }
        true
    }

    pub fn media_can_play(&mut self, media: &NodeRef) {
        if let Some(playback) = self.playback.as_mut() {
            playback.on_can_play(media, self.media.as_mut());
        }
    }

    pub fn media_ended(&mut self, media: &NodeRef) {
        if let Some(playback) = self.playback.as_mut() {
            playback.on_ended(media, self.materializer.blobs(), self.media.as_mut());
        }
    }

    /// A submit event reached `form`.
    pub fn submit(&mut self, form: &NodeRef) -> SubmitDisposition {
        if !self.submit_bound {
            return SubmitDisposition::Default;
        }
        if attribute(form, "id").as_deref() != Some(self.config.form_id.as_str()) {
            return SubmitDisposition::Default;
        }
        let Some(fields) = extract_form_values(form) else {
            return SubmitDisposition::Default;
        };
        debug!(target = "answers", fields = fields.len(), "relaying form submission");
        self.send(Message::AnswerSubmit(fields));
        SubmitDisposition::Intercepted
    }

    pub fn submit_main_form(&mut self) -> SubmitDisposition {
        match self.document.element_by_id(&self.config.form_id) {
            Some(form) => self.submit(&form),
            None => SubmitDisposition::Default,
        }
    }

    /// Deliver every envelope the host has sent so far.
    pub fn pump_messages(&mut self) -> usize {
        let inbound = self.channel.drain();
        let count = inbound.len();
        for envelope in inbound {
            self.dispatch(envelope);
        }
        count
    }

    pub fn run_turn(&mut self) -> usize {
        run_turn(self)
    }

    /// Alternate task turns and inbound delivery until both are quiet.
    pub fn run_until_idle(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let step = run_turn(self) + self.pump_messages();
            if step == 0 {
                return processed;
            }
            processed += step;
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        if envelope.context_id != self.context_id {
            warn!(
                target = "channel",
                expected = %self.context_id,
                received = %envelope.context_id,
                "envelope for another frame dropped"
            );
            return;
        }
        match envelope.message {
            Message::ResourceResponse(response) => self.handle_response(response),
            Message::Submit { button } => self.handle_submit_trigger(&button),
            Message::Extension { kind, payload } => match self.extension.as_mut() {
                Some(hook) => hook(&kind, &payload),
                None => {
                    warn!(target = "channel", kind = %kind, "unexpected message type and no extension hook; dropped");
                }
            },
            message @ (Message::ResourceRequest(_) | Message::AnswerSubmit(_)) => {
                warn!(target = "channel", kind = message.kind(), "host sent a host-bound kind; dropped");
            }
        }
    }

    fn handle_response(&mut self, response: ResourceResponse) {
        let key = response.key.clone();
        let materializer = &mut self.materializer;
        match self
            .ledger
            .resolve(&key, || materializer.materialize(response))
        {
            Ok((handle, targets)) => {
                let patched = Materializer::apply(key.element_kind, &handle, &targets);
                debug!(target = "ledger", key = %key, patched, "resource resolved");
                self.notify_handle_applied(&targets);
            }
            Err(err) => {
                warn!(target = "ledger", error = %err, "protocol violation; response dropped");
            }
        }
    }

    fn handle_submit_trigger(&mut self, button: &str) {
        let Some(form) = self.document.element_by_id(&self.config.form_id) else {
            warn!(target = "answers", form = %self.config.form_id, "submit requested but form is missing");
            return;
        };

        let existing = form
            .descendants()
            .elements()
            .map(|element| element.as_node().clone())
            .find(|node| {
                attribute(node, "name").as_deref() == Some("submit")
                    && attribute(node, "type").as_deref() == Some("hidden")
            });
        match existing {
            Some(input) => {
                set_attribute(&input, "value", button);
            }
            None => match create_element(
                "input",
                &[("type", "hidden"), ("name", "submit"), ("value", button)],
            ) {
                Some(input) => form.append(input),
                None => return,
            },
        }

        if self.submit(&form) == SubmitDisposition::Default {
            debug!(target = "answers", "host submit arrived before the bridge was bound");
        }
    }

    fn notify_handle_applied(&mut self, targets: &[NodeRef]) {
        if let Some(playback) = self.playback.as_mut() {
            for target in targets {
                playback.on_handle_applied(target, self.media.as_mut());
            }
        }
    }

    fn install_card_behaviour(&mut self) {
        if let Some(bootstrap) = &self.bootstrap {
            restore_typed_answers(&self.document, bootstrap);
        }

        let media = self.document.elements_by_tag(&self.config.media_tag);
        let mut playback = PlaybackController::new(media);
        if !playback.is_empty() {
            debug!(target = "playback", count = playback.len(), "chaining card audio");
        }
        playback.start(self.materializer.blobs(), self.media.as_mut());
        self.playback = Some(playback);

        if self.document.element_by_id(&self.config.form_id).is_none() {
            debug!(target = "answers", form = %self.config.form_id, "card has no answer form");
        }
        self.submit_bound = true;
    }

    fn send(&self, message: Message) {
        self.channel
            .send(&Envelope::new(self.context_id.clone(), message));
    }
}
