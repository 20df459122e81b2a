mod channel;
mod envelope;
mod key;

pub use channel::{channel_pair, ChannelEnd};
pub use envelope::{
    is_reserved_kind, AnswerFields, AnswerValue, Envelope, EnvelopeError, Message,
    ResourceResponse, ANSWER_SUBMIT, RESOURCE_REQUEST, RESOURCE_RESPONSE, SUBMIT,
};
pub use key::{ElementKind, ResourceKey};
