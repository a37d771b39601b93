// Stateful revision sessions: the stage machine, snapshot/revert and the
// orchestrator that sequences model calls against a live document.

pub mod handlers;
pub mod orchestrator;
pub mod registry;
pub mod state;
pub mod store;
