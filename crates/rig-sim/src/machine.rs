//! Generic finite-state engine for simulated devices
//!
//! A [`StateMachine`] holds named states with optional entry/tick/exit
//! hooks and an ordered table of guarded transitions. The machine itself
//! owns no time source; a simulation clock calls [`StateMachine::tick`]
//! with the elapsed `dt` and the machine advances the device model it is
//! given.
//!
//! Transition evaluation is deterministic: transitions out of the active
//! state are tried in declared order and the first guard returning true
//! fires. At most one transition fires per tick; there is no chaining.
//!
//! Guards are pure with respect to the tick. They receive a shared
//! reference to the model and must not mutate it; mutation belongs in
//! state hooks.

use tracing::{debug, warn};

use crate::device::DeviceModel;
use crate::error::{ConfigError, GuardError};

/// State lifecycle hook: receives the device model and elapsed seconds
pub type Hook = Box<dyn FnMut(&mut DeviceModel, f64) + Send>;

/// Transition guard: read-only predicate over the device model
///
/// A guard returning `Err` aborts transition evaluation for that tick;
/// the machine stays in its current state and the failure is reported
/// through `tracing`.
pub type Guard = Box<dyn Fn(&DeviceModel) -> Result<bool, GuardError> + Send>;

/// A named state with optional lifecycle hooks
pub struct State {
    name: String,
    on_entry: Option<Hook>,
    on_tick: Option<Hook>,
    on_exit: Option<Hook>,
}

impl State {
    /// Create a state with no hooks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_entry: None,
            on_tick: None,
            on_exit: None,
        }
    }

    /// Hook invoked when a transition enters this state
    pub fn on_entry(mut self, hook: impl FnMut(&mut DeviceModel, f64) + Send + 'static) -> Self {
        self.on_entry = Some(Box::new(hook));
        self
    }

    /// Hook invoked on every tick while this state is active
    pub fn on_tick(mut self, hook: impl FnMut(&mut DeviceModel, f64) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(hook));
        self
    }

    /// Hook invoked when a transition leaves this state
    pub fn on_exit(mut self, hook: impl FnMut(&mut DeviceModel, f64) + Send + 'static) -> Self {
        self.on_exit = Some(Box::new(hook));
        self
    }
}

struct Transition {
    source: usize,
    dest: usize,
    guard: Guard,
}

/// Finite-state engine driving one device model
pub struct StateMachine {
    states: Vec<State>,
    transitions: Vec<Transition>,
    active: usize,
}

// Manual impl: hooks and guards are boxed closures, so Debug cannot be derived.
impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field(
                "states",
                &self.states.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .field("transitions", &self.transitions.len())
            .field("active", &self.active)
            .finish()
    }
}

impl StateMachine {
    /// Start building a state machine
    pub fn builder() -> MachineBuilder {
        MachineBuilder::default()
    }

    /// Name of the currently active state
    pub fn active_state(&self) -> &str {
        &self.states[self.active].name
    }

    /// Force the active state without invoking exit/entry hooks
    ///
    /// Intended for simulator startup only; normal state changes go
    /// through guarded transitions.
    pub fn reset(&mut self, initial: &str) -> Result<(), ConfigError> {
        match self.states.iter().position(|s| s.name == initial) {
            Some(idx) => {
                self.active = idx;
                Ok(())
            }
            None => Err(ConfigError::UnknownState(initial.to_string())),
        }
    }

    /// Advance the machine by `dt` seconds
    ///
    /// Runs the active state's tick hook, then evaluates its outgoing
    /// transitions in declared order. The first guard returning true
    /// fires: exit hook, state switch, entry hook, all before this call
    /// returns. If no guard fires the active state is unchanged.
    pub fn tick(&mut self, model: &mut DeviceModel, dt: f64) {
        if let Some(hook) = self.states[self.active].on_tick.as_mut() {
            hook(model, dt);
        }

        let mut fired = None;
        for transition in &self.transitions {
            if transition.source != self.active {
                continue;
            }
            match (transition.guard)(model) {
                Ok(true) => {
                    fired = Some(transition.dest);
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "guard evaluation failed in state {}: {}",
                        self.states[self.active].name, e
                    );
                    return;
                }
            }
        }

        if let Some(dest) = fired {
            if let Some(hook) = self.states[self.active].on_exit.as_mut() {
                hook(model, dt);
            }
            let from = self.active;
            self.active = dest;
            if let Some(hook) = self.states[self.active].on_entry.as_mut() {
                hook(model, dt);
            }
            debug!(
                "transition fired: {} -> {}",
                self.states[from].name, self.states[dest].name
            );
        }
    }
}

/// Builder for [`StateMachine`]
///
/// State names, the initial state, and the transition table are validated
/// at [`build`](MachineBuilder::build); a transition referencing an
/// undeclared state or a duplicate (source, dest) pair is a
/// [`ConfigError`].
#[derive(Default)]
pub struct MachineBuilder {
    states: Vec<State>,
    transitions: Vec<(String, String, Guard)>,
    initial: Option<String>,
}

impl MachineBuilder {
    /// Declare a state
    pub fn state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    /// Designate the initial state
    pub fn initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Declare a transition with an infallible guard
    pub fn transition(
        self,
        source: impl Into<String>,
        dest: impl Into<String>,
        guard: impl Fn(&DeviceModel) -> bool + Send + 'static,
    ) -> Self {
        self.transition_fallible(source, dest, move |model| Ok(guard(model)))
    }

    /// Declare a transition whose guard may fail to evaluate
    pub fn transition_fallible(
        mut self,
        source: impl Into<String>,
        dest: impl Into<String>,
        guard: impl Fn(&DeviceModel) -> Result<bool, GuardError> + Send + 'static,
    ) -> Self {
        self.transitions
            .push((source.into(), dest.into(), Box::new(guard)));
        self
    }

    /// Validate the configuration and build the machine
    pub fn build(self) -> Result<StateMachine, ConfigError> {
        for (i, state) in self.states.iter().enumerate() {
            if self.states[..i].iter().any(|s| s.name == state.name) {
                return Err(ConfigError::DuplicateState(state.name.clone()));
            }
        }

        let index_of = |name: &str| self.states.iter().position(|s| s.name == name);

        let initial = self.initial.ok_or(ConfigError::MissingInitialState)?;
        let active = index_of(&initial).ok_or(ConfigError::UnknownState(initial))?;

        let mut transitions = Vec::with_capacity(self.transitions.len());
        for (source, dest, guard) in self.transitions {
            let source_idx =
                index_of(&source).ok_or_else(|| ConfigError::UnknownState(source.clone()))?;
            let dest_idx =
                index_of(&dest).ok_or_else(|| ConfigError::UnknownState(dest.clone()))?;
            if transitions
                .iter()
                .any(|t: &Transition| t.source == source_idx && t.dest == dest_idx)
            {
                return Err(ConfigError::DuplicateTransition { source, dest });
            }
            transitions.push(Transition {
                source: source_idx,
                dest: dest_idx,
                guard,
            });
        }

        Ok(StateMachine {
            states: self.states,
            transitions,
            active,
        })
    }
}
