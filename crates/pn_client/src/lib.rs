pub mod api;
pub mod csrf;

pub use api::{PortalClient, TaskRoutes};
pub use csrf::PageContext;

pub mod prelude {
    pub use crate::{PageContext, PortalClient, TaskRoutes};
    pub use pn_core::{Error, Result, StatusFetch, SubmitOutcome, TaskState, TaskSubmit};
}
