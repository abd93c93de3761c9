mod bootstrap;
mod gameplay;
mod loop_runner;
mod map_document;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
