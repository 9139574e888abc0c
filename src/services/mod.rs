// marksync services
// Stateless helpers: drop resolution, link checking, settings persistence.

pub mod drop_resolver;
pub mod link_checker;
pub mod settings_engine;
