use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use voxel_ecs::{Component, Owner};

/// Who gets the keyboard when several listeners are active. Higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InputPriority {
    /// Camera movement and other in-world controls.
    World,
    /// Debug console and other overlays that swallow typing.
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Default)]
struct FocusState {
    active: Vec<(ListenerId, InputPriority, u64)>,
    next_id: u64,
    seq: u64,
}

impl FocusState {
    fn top(&self) -> Option<ListenerId> {
        self.active
            .iter()
            .max_by_key(|(_, priority, seq)| (*priority, *seq))
            .map(|(id, _, _)| *id)
    }
}

/// Arbitrates input between listeners. Clones share one registry.
#[derive(Debug, Clone, Default)]
pub struct InputFocus {
    inner: Rc<RefCell<FocusState>>,
}

impl InputFocus {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) -> ListenerId {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        ListenerId(state.next_id)
    }

    fn add(&self, id: ListenerId, priority: InputPriority) {
        let mut state = self.inner.borrow_mut();
        if state.active.iter().any(|(active, _, _)| *active == id) {
            return;
        }
        state.seq += 1;
        let seq = state.seq;
        state.active.push((id, priority, seq));
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut state = self.inner.borrow_mut();
        let before = state.active.len();
        state.active.retain(|(active, _, _)| *active != id);
        before != state.active.len()
    }

    fn is_active(&self, id: ListenerId) -> bool {
        self.inner
            .borrow()
            .active
            .iter()
            .any(|(active, _, _)| *active == id)
    }

    /// True if `id` is the active listener with the highest priority; the
    /// most recent registration wins ties.
    pub fn can_listen(&self, id: ListenerId) -> bool {
        self.inner.borrow().top() == Some(id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.borrow().active.len()
    }
}

/// Component giving its owner a place in input-focus arbitration.
///
/// Cloning yields another handle to the same listener, so an entity can keep
/// one handle as a field while attaching another as its component.
#[derive(Debug, Clone)]
pub struct InputListenerComponent {
    pub priority: InputPriority,
    id: ListenerId,
    focus: InputFocus,
}

impl InputListenerComponent {
    pub fn new(focus: &InputFocus, priority: InputPriority) -> Self {
        Self {
            priority,
            id: focus.allocate(),
            focus: focus.clone(),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn can_listen(&self) -> bool {
        self.focus.can_listen(self.id)
    }

    pub fn is_listening(&self) -> bool {
        self.focus.is_active(self.id)
    }

    pub fn start_listening(&self) {
        self.focus.add(self.id, self.priority);
        tracing::debug!(priority = ?self.priority, "input listener started");
    }

    pub fn stop_listening(&self) {
        if self.focus.remove(self.id) {
            tracing::debug!(priority = ?self.priority, "input listener stopped");
        }
    }
}

impl Component for InputListenerComponent {
    fn setup(&mut self, _owner: &Owner) {}

    fn destroy(&mut self) {
        self.stop_listening();
    }

    fn name(&self) -> &'static str {
        "InputListenerComponent"
    }
}
