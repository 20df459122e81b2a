// Library exports for the binary and integration tests

pub mod config;
pub mod frame;
pub mod host;
pub mod protocol;
pub mod schedule;

// Re-export commonly used types for tests
pub use config::{Config, FrameConfig, HostConfig};
pub use frame::{Face, Frame, FrameBootstrap, SubmitDisposition};
pub use host::{drive, DirectoryResolver, HostRouter, MemoryResolver, ResourceResolver};
pub use protocol::{channel_pair, ChannelEnd, Envelope, Message, ResourceKey};
