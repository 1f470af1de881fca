//! Runtime services shared by the HTTP server and the CLI.
//!
//! - [`session`]: resolves bearer tokens to an [`Identity`](installdesk_core::Identity)
//!   and publishes the signed-in state
//! - [`workspace`]: a scoped, locally cached view of the store with
//!   confirm-then-apply writes
//! - [`reminder`]: installation reminder dispatch through a [`Mailer`](reminder::Mailer)

pub mod error;
pub mod reminder;
pub mod session;
pub mod workspace;

pub use error::RuntimeError;
pub use reminder::{
    LogMailer, MailError, Mailer, ReminderDispatcher, ReminderMessage, ReminderReport,
    ReminderResult, ReminderStatus,
};
pub use session::{Authenticator, SessionProvider, SessionState};
pub use workspace::{RefreshOutcome, Workspace, WorkspaceState, report_overpayment};
