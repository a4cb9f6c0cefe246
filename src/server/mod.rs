pub mod context;
pub mod exec;
pub mod git;
pub mod handlers;
pub mod http;

pub use context::{AppError, AppState, SharedSettings};
pub use exec::{run_streaming, StreamEvent};
pub use git::{
    CommitOutcome, CredentialIdentity, GitError, RepositoryHandle, RepositoryStatusSnapshot,
    ResetReport,
};
pub use http::{build_router, run_server};
