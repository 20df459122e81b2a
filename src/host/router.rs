use std::collections::HashMap;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::resolver::ResourceResolver;
use crate::frame::Frame;
use crate::protocol::{
    is_reserved_kind, AnswerFields, ChannelEnd, Envelope, Message, ResourceKey, ResourceResponse,
};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("frame {0} is already registered")]
    AlreadyRegistered(String),
    #[error("frame {0} is not registered")]
    NotRegistered(String),
    #[error("'{0}' is a protocol kind and cannot be sent as an extension")]
    ReservedKind(String),
}

/// Answers relayed by a frame's form bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub card_id: String,
    pub context_id: String,
    pub fields: AnswerFields,
}

type ExtensionListener = Box<dyn FnMut(&str, &JsonValue)>;

struct FrameLink {
    card_id: String,
    channel: ChannelEnd,
}

/// Host side of every live card frame.
pub struct HostRouter<R> {
    resolver: R,
    frames: HashMap<String, FrameLink>,
    listeners: HashMap<String, ExtensionListener>,
    submissions: Vec<Submission>,
}

impl<R: ResourceResolver> HostRouter<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            frames: HashMap::new(),
            listeners: HashMap::new(),
            submissions: Vec::new(),
        }
    }

    pub fn register_frame(
        &mut self,
        context_id: impl Into<String>,
        card_id: impl Into<String>,
        channel: ChannelEnd,
    ) -> Result<(), HostError> {
        let context_id = context_id.into();
        if self.frames.contains_key(&context_id) {
            return Err(HostError::AlreadyRegistered(context_id));
        }
        let card_id = card_id.into();
        info!(target = "host", context = %context_id, card = %card_id, "frame registered");
        self.frames.insert(context_id, FrameLink { card_id, channel });
        Ok(())
    }

    /// Drop the host end of a frame's channel. Envelopes still queued from
    /// that frame are discarded.
    pub fn unregister_frame(&mut self, context_id: &str) -> Result<(), HostError> {
        if self.frames.remove(context_id).is_none() {
            return Err(HostError::NotRegistered(context_id.to_string()));
        }
        debug!(target = "host", context = %context_id, "frame unregistered");
        Ok(())
    }

    pub fn is_registered(&self, context_id: &str) -> bool {
        self.frames.contains_key(context_id)
    }

    /// Ask a frame to submit its answer form as if `button` was pressed.
    pub fn trigger_submit(&self, context_id: &str, button: &str) -> Result<(), HostError> {
        self.send(
            context_id,
            Message::Submit {
                button: button.to_string(),
            },
        )
    }

    pub fn send_extension(
        &self,
        context_id: &str,
        kind: &str,
        payload: JsonValue,
    ) -> Result<(), HostError> {
        if is_reserved_kind(kind) {
            return Err(HostError::ReservedKind(kind.to_string()));
        }
        self.send(
            context_id,
            Message::Extension {
                kind: kind.to_string(),
                payload,
            },
        )
    }

    /// Replaces any listener already registered for `kind`.
    pub fn on_extension(
        &mut self,
        kind: impl Into<String>,
        listener: impl FnMut(&str, &JsonValue) + 'static,
    ) {
        self.listeners.insert(kind.into(), Box::new(listener));
    }

    /// Handle every envelope the frames have sent so far. Returns how many
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let mut inbound = Vec::new();
        for (context_id, link) in self.frames.iter_mut() {
            for envelope in link.channel.drain() {
                inbound.push((context_id.clone(), envelope));
            }
        }

        let count = inbound.len();
        for (context_id, envelope) in inbound {
            self.dispatch(&context_id, envelope);
        }
        count
    }

    pub fn take_submissions(&mut self) -> Vec<Submission> {
        std::mem::take(&mut self.submissions)
    }

    fn dispatch(&mut self, context_id: &str, envelope: Envelope) {
        if envelope.context_id != context_id {
            warn!(
                target = "host",
                channel = %context_id,
                claimed = %envelope.context_id,
                "envelope claims another frame; dropped"
            );
            return;
        }
        match envelope.message {
            Message::ResourceRequest(key) => self.answer_request(context_id, key),
            Message::AnswerSubmit(fields) => {
                let Some(link) = self.frames.get(context_id) else {
                    return;
                };
                info!(target = "host", card = %link.card_id, fields = fields.len(), "answer submitted");
                self.submissions.push(Submission {
                    card_id: link.card_id.clone(),
                    context_id: context_id.to_string(),
                    fields,
                });
            }
            Message::Extension { kind, payload } => match self.listeners.get_mut(&kind) {
                Some(listener) => listener(context_id, &payload),
                None => warn!(target = "host", kind = %kind, "unexpected message type; dropped"),
            },
            message @ (Message::ResourceResponse(_) | Message::Submit { .. }) => {
                warn!(target = "host", kind = message.kind(), "frame sent a frame-bound kind; dropped");
            }
        }
    }

    fn answer_request(&self, context_id: &str, key: ResourceKey) {
        let Some(link) = self.frames.get(context_id) else {
            return;
        };
        match self.resolver.resolve(&link.card_id, &key) {
            Ok(Some(attachment)) => {
                debug!(target = "host", key = %key, bytes = attachment.data.len(), "serving resource");
                link.channel.send(&Envelope::new(
                    context_id,
                    Message::ResourceResponse(ResourceResponse {
                        key,
                        content_type: attachment.content_type,
                        data: attachment.data,
                    }),
                ));
            }
            Ok(None) => {
                warn!(target = "host", card = %link.card_id, key = %key, "resource not found; request left unanswered");
            }
            Err(err) => {
                warn!(target = "host", key = %key, error = %err, "failed to resolve resource; request left unanswered");
            }
        }
    }

    fn send(&self, context_id: &str, message: Message) -> Result<(), HostError> {
        let link = self
            .frames
            .get(context_id)
            .ok_or_else(|| HostError::NotRegistered(context_id.to_string()))?;
        link.channel.send(&Envelope::new(context_id, message));
        Ok(())
    }
}

/// Run a frame and its host against each other until neither has work left.
pub fn drive<R: ResourceResolver>(frame: &mut Frame, host: &mut HostRouter<R>) -> usize {
    let mut processed = 0;
    loop {
        let step = frame.run_until_idle() + host.pump();
        if step == 0 {
            return processed;
        }
        processed += step;
    }
}
