//! Huly domain API.
//!
//! Typed entities and the operations the plugin and manifest server expose,
//! layered on top of [`RpcClient`](crate::RpcClient).

mod api;
mod types;

pub use api::{
    //
    HulyApi,
    HulyError,
    HulyResult,
    NewDocument,
    NewIssue,
    NewMilestone,
};

pub use types::{
    //
    CommunicationChannel,
    Document,
    Issue,
    Milestone,
    Modified,
    Person,
    Priority,
    Project,
    Timestamp,
};
