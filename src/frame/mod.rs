mod answers;
mod bootstrap;
mod context;
mod document;
mod event_loop;
mod ledger;
mod materializer;
mod playback;
mod ready;

pub use answers::{extract_form_values, restore_typed_answers};
pub use bootstrap::{BootstrapError, Face, FrameBootstrap, TYPED_ANSWER_PREFIX};
pub use context::{ExtensionHook, Frame, SubmitDisposition};
pub use document::{
    attribute, create_element, has_attribute, is_relative_reference, set_attribute, tag_name,
    CardDocument, ReadyState,
};
pub use event_loop::{run_turn, run_until_idle, EventLoopContext, Task, TaskId, TaskQueue};
pub use ledger::{key_for_node, FailureOutcome, LedgerError, ResourceEntry, ResourceLedger, ResourceState};
pub use materializer::{Blob, BlobRegistry, Materializer};
pub use playback::{MediaBackend, PlaybackController, PlaybackState, TracingMediaBackend};
pub use ready::{fire, on_ready, ReadyContext, ReadyGate};
