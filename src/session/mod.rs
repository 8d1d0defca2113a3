//! Member session state: demo directory, sign-in/out, file persistence.

mod members;
mod store;

pub use members::{demo_members, find_member, ClaimSummary, MemberProfile, DEMO_PASSWORD};
pub use store::SessionStore;
