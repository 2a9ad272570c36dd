mod anchorage;
mod event;
mod grouper;
mod machine;
mod state;

pub use anchorage::{AnchorageIndex, NamedAnchorage};
pub use event::{EventType, PortEvent};
pub use grouper::{PortVisit, group_visits, visit_id};
pub use machine::{MachineConfig, VisitStateMachine};
pub use state::{MachineState, VisitState};

#[cfg(test)]
#[ctor::ctor]
fn setup_test_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .with_ansi(true)
        .init();
}
