mod resolver;
mod router;

pub use resolver::{
    content_type_for, Attachment, DirectoryResolver, MemoryResolver, ResolveError,
    ResourceResolver,
};
pub use router::{drive, HostError, HostRouter, Submission};
