// Git module - modular structure for repository operations
//
// This module is split into logical submodules:
// - utils: Common types, constants, error handling, and git invocation helpers
// - credentials: SSH key lookup for pushes
// - repo: The locked, process-wide repository handle
// - status: Status snapshot (changes, branches, HEAD, remotes, needs-push)
// - branches: Checkout-or-create branch switching
// - commit: Stage-everything commit and push
// - operations: Reset of unwanted changes

pub mod branches;
pub mod commit;
pub mod credentials;
pub mod operations;
pub mod repo;
pub mod status;
pub mod utils;

pub use credentials::{CredentialError, CredentialIdentity};
pub use repo::{Repository, RepositoryHandle};
pub use utils::*;
