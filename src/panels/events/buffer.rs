use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::model::{AgentEvent, EventType};

/// Maximum number of events retained
pub const EVENT_CAPACITY: usize = 500;

/// An event together with its local receipt sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedEvent {
    pub seq: u64,
    pub event: AgentEvent,
}

/// Bounded, insertion-ordered event buffer.
///
/// Sequence numbers are assigned on receipt and never reused, not even after
/// [`EventBuffer::clear`].
#[derive(Debug)]
pub struct EventBuffer {
    entries: VecDeque<BufferedEvent>,
    capacity: usize,
    next_seq: u64,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Append an event, evicting the oldest one when full.
    /// Returns the sequence number assigned and the evicted one, if any.
    pub fn push(&mut self, event: AgentEvent) -> (u64, Option<u64>) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front().map(|e| e.seq)
        } else {
            None
        };
        self.entries.push_back(BufferedEvent { seq, event });
        (seq, evicted)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.get(seq).is_some()
    }

    pub fn get(&self, seq: u64) -> Option<&BufferedEvent> {
        // Sequence numbers are strictly increasing
        self.entries
            .binary_search_by_key(&seq, |e| e.seq)
            .ok()
            .and_then(|i| self.entries.get(i))
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BufferedEvent> {
        self.entries.iter()
    }

    /// Events passing `filter`, oldest first
    pub fn visible<'a>(
        &'a self,
        filter: &'a EventFilter,
        scope: Option<&'a str>,
    ) -> impl Iterator<Item = &'a BufferedEvent> + 'a {
        self.entries.iter().filter(move |e| filter.matches(&e.event, scope))
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Type and repository filter for the events panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Selected types; empty shows everything
    pub types: BTreeSet<EventType>,
    /// Only show events from the scoped repository
    pub repo_only: bool,
}

impl EventFilter {
    pub fn matches(&self, event: &AgentEvent, scope: Option<&str>) -> bool {
        if !self.types.is_empty() && !self.types.contains(&event.event_type) {
            return false;
        }
        match (self.repo_only, scope) {
            (true, Some(scope)) => event
                .repository
                .as_ref()
                .is_some_and(|repo| repo.matches_path(scope)),
            _ => true,
        }
    }

    /// Add the type if absent, remove it if present
    pub fn toggle_type(&mut self, event_type: EventType) {
        if !self.types.remove(&event_type) {
            self.types.insert(event_type);
        }
    }
}

/// Set of expanded events, keyed by sequence number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    expanded: HashSet<u64>,
}

impl Expansion {
    pub fn toggle(&mut self, seq: u64) {
        if !self.expanded.remove(&seq) {
            self.expanded.insert(seq);
        }
    }

    pub fn is_expanded(&self, seq: u64) -> bool {
        self.expanded.contains(&seq)
    }

    pub fn remove(&mut self, seq: u64) {
        self.expanded.remove(&seq);
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.expanded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::Repository;

    fn event(n: usize) -> AgentEvent {
        AgentEvent::new(EventType::PreToolUse, format!("s{}", n))
    }

    fn repo_event(event_type: EventType, path: Option<&str>) -> AgentEvent {
        let mut e = AgentEvent::new(event_type, "s");
        e.repository = path.map(|p| Repository {
            path: p.to_string(),
            ..Default::default()
        });
        e
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buffer = EventBuffer::new();
        let mut evicted = Vec::new();
        for n in 0..=500 {
            let (seq, gone) = buffer.push(event(n));
            assert_eq!(seq, n as u64);
            evicted.extend(gone);
        }
        assert_eq!(buffer.len(), EVENT_CAPACITY);
        assert_eq!(evicted, vec![0]);
        assert!(!buffer.contains(0));
        let seqs: Vec<u64> = buffer.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=500).collect::<Vec<u64>>());
        assert_eq!(buffer.iter().next().unwrap().event.session_id, "s1");
    }

    #[test]
    fn test_long_stream_keeps_most_recent_in_order() {
        let mut buffer = EventBuffer::with_capacity(10);
        for n in 0..37 {
            buffer.push(event(n));
        }
        assert_eq!(buffer.len(), 10);
        let seqs: Vec<u64> = buffer.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (27..37).collect::<Vec<u64>>());
    }

    #[test]
    fn test_sequence_not_reused_after_clear() {
        let mut buffer = EventBuffer::new();
        buffer.push(event(0));
        buffer.push(event(1));
        buffer.clear();
        assert!(buffer.is_empty());
        let (seq, _) = buffer.push(event(2));
        assert_eq!(seq, 2);
        assert_eq!(buffer.get(2).unwrap().event.session_id, "s2");
    }

    #[test]
    fn test_type_filter() {
        let mut buffer = EventBuffer::new();
        buffer.push(AgentEvent::new(EventType::SessionStart, "a"));
        buffer.push(AgentEvent::new(EventType::PreToolUse, "a"));
        buffer.push(AgentEvent::new(EventType::PostToolUse, "a"));

        let mut filter = EventFilter::default();
        assert_eq!(buffer.visible(&filter, None).count(), 3);

        filter.toggle_type(EventType::PreToolUse);
        filter.toggle_type(EventType::PostToolUse);
        let seqs: Vec<u64> = buffer.visible(&filter, None).map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);

        filter.toggle_type(EventType::PreToolUse);
        let seqs: Vec<u64> = buffer.visible(&filter, None).map(|e| e.seq).collect();
        assert_eq!(seqs, vec![2]);
    }

    #[test]
    fn test_repo_filter() {
        let mut buffer = EventBuffer::new();
        buffer.push(repo_event(EventType::Stop, Some("/work/app/")));
        buffer.push(repo_event(EventType::Stop, Some("/work/other")));
        buffer.push(repo_event(EventType::Stop, None));

        let filter = EventFilter {
            repo_only: true,
            ..Default::default()
        };
        let seqs: Vec<u64> = buffer
            .visible(&filter, Some("/work/app"))
            .map(|e| e.seq)
            .collect();
        assert_eq!(seqs, vec![0]);

        // No scoped repository: nothing is hidden
        assert_eq!(buffer.visible(&filter, None).count(), 3);
    }

    #[test]
    fn test_expansion_toggle_is_involution() {
        let mut expansion = Expansion::default();
        expansion.toggle(3);
        let before = expansion.clone();

        expansion.toggle(7);
        assert!(expansion.is_expanded(7));
        expansion.toggle(7);
        assert_eq!(expansion, before);

        expansion.toggle(3);
        assert!(!expansion.is_expanded(3));
        assert_eq!(expansion.len(), 0);
    }
}
