//! Session bootstrap: token sign-in, then anonymous sign-in, then a
//! locally generated identity. The bootstrap never fails.

pub mod bootstrap;
pub mod error;
pub mod identity;

pub use bootstrap::{Session, SessionBootstrapper, SessionState, SignInMethod};
pub use error::{Result, SessionError};
pub use identity::{IdentityService, LocalFileIdentity};
