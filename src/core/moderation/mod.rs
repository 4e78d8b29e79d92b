// Core moderation module - contains the hate speech moderation logic.
// Platform adapters only see directives; stores only see counters.

pub mod directive_dispatch;
pub mod enforcement_policy;
pub mod moderation_models;
pub mod moderation_service;
pub mod moderation_store;

pub use directive_dispatch::*;
pub use moderation_models::*;
pub use moderation_service::*;
pub use moderation_store::*;
