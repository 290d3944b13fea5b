use super::CombatEvent;

/// Receives events produced by the line processor.
///
/// Implementations are shared across worker threads, so `handle_event`
/// takes `&self` and does its own synchronization.
pub trait EventSink: Send + Sync {
    fn handle_event(&self, event: CombatEvent);

    fn handle_events(&self, events: Vec<CombatEvent>) {
        for event in events {
            self.handle_event(event);
        }
    }
}
