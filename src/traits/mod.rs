pub mod action;
pub mod backend;

pub use action::{Action, ActionContext};
pub use backend::{Backend, BackendCredentials, BackendDescription, BackendSummary};
