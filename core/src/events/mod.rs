pub mod event;
pub mod sink;

pub use event::{Classified, CombatEvent, Payload, TargetRef};
pub use sink::EventSink;
