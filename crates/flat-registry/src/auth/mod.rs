//! Stateless token identity and the two-stage access gate.

pub mod domain;
pub mod gate;
pub mod router;
pub mod token;

pub use domain::{Identity, Role, UnknownRole, UserId};
pub use gate::{authenticate, authorize, identify, require_role, AuthError};
pub use router::token_router;
pub use token::{Claims, TokenError, TokenService};
