pub mod guard;
pub mod rbac;
pub mod resolver;
pub mod session;
pub mod token;

pub use guard::{guard, guard_authenticated};
pub use rbac::{Action, Decision, Grant, Resource, Role};
pub use resolver::SessionResolver;
pub use session::Session;
