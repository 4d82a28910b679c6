//! Event declarations and dispatch.
//!
//! Templates declare which predicate governs which transition. Detecting
//! crossings is the solver's job; it reports the events that fired in one
//! evaluation to [`EventRegistry::dispatch`], which checks that the requested
//! transitions are consistent and commits them all at once.

use std::collections::BTreeMap;

use crate::circuit::{ClockId, ComponentId, ControlId, EventId, ModeId};
use crate::error::{KirchhoffError, Result};
use crate::expr::{EvalContext, Expr};

use super::mode::Mode;

/// Edge of a boolean control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Direction of a zero crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Negative to positive
    Up,
    /// Positive to negative
    Down,
    Either,
}

/// The control input of a switching device.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// An external boolean
    Input(ControlId),
    /// A continuous signal, on while `signal > level`
    Level { signal: Expr, level: f64 },
}

impl Control {
    /// Trigger for the control turning on (`Rising`) or off (`Falling`).
    pub fn trigger(&self, edge: Edge) -> Trigger {
        match self {
            Control::Input(control) => Trigger::Control {
                control: *control,
                edge,
            },
            Control::Level { signal, level } => Trigger::Crossing {
                expr: signal.clone() - *level,
                direction: match edge {
                    Edge::Rising => Direction::Up,
                    Edge::Falling => Direction::Down,
                },
            },
        }
    }

    /// Guard that holds while the control is on.
    pub fn is_on(&self) -> Guard {
        match self {
            Control::Input(control) => Guard::Control(*control, true),
            Control::Level { signal, level } => Guard::Above(signal.clone(), *level),
        }
    }

    /// Guard that holds while the control is off.
    pub fn is_off(&self) -> Guard {
        match self {
            Control::Input(control) => Guard::Control(*control, false),
            Control::Level { signal, level } => Guard::NotAbove(signal.clone(), *level),
        }
    }
}

/// What the solver watches for.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// A boolean control changes
    Control { control: ControlId, edge: Edge },
    /// An expression crosses zero
    Crossing { expr: Expr, direction: Direction },
    /// A fixed instant
    Time(f64),
}

/// Condition checked when an event fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Always,
    /// The control has the given value
    Control(ControlId, bool),
    /// `expr >= threshold`
    AtLeast(Expr, f64),
    /// `expr > threshold`
    Above(Expr, f64),
    /// `expr <= threshold`
    NotAbove(Expr, f64),
    /// `expr != 0`
    Nonzero(Expr),
    /// `expr == 0`
    Zero(Expr),
}

impl Guard {
    pub fn holds(&self, ctx: &EvalContext) -> Result<bool> {
        Ok(match self {
            Guard::Always => true,
            Guard::Control(control, value) => ctx.control(*control)? == *value,
            Guard::AtLeast(expr, threshold) => ctx.eval_real(expr)? >= *threshold,
            Guard::Above(expr, threshold) => ctx.eval_real(expr)? > *threshold,
            Guard::NotAbove(expr, threshold) => ctx.eval_real(expr)? <= *threshold,
            Guard::Nonzero(expr) => ctx.eval_real(expr)? != 0.0,
            Guard::Zero(expr) => ctx.eval_real(expr)? == 0.0,
        })
    }
}

/// A guarded change of one mode variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub mode: ModeId,
    pub from: Mode,
    pub to: Mode,
    pub guard: Guard,
    /// Clock restarted at the event time when the transition commits
    pub reset: Option<ClockId>,
    /// Among simultaneous transitions of one component, only the highest
    /// priority ones are considered
    pub priority: u8,
}

impl Transition {
    pub fn new(mode: ModeId, from: Mode, to: Mode) -> Self {
        Self {
            mode,
            from,
            to,
            guard: Guard::Always,
            reset: None,
            priority: 0,
        }
    }

    pub fn when(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    pub fn resetting(mut self, clock: ClockId) -> Self {
        self.reset = Some(clock);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// What happens when an event fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Transition(Transition),
    /// Integration restarts at the event; no discrete state changes
    Restart,
}

/// A registered event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub component: ComponentId,
    pub trigger: Trigger,
    pub effect: Effect,
}

/// A transition that was committed by dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub component: ComponentId,
    pub mode: ModeId,
    pub from: Mode,
    pub to: Mode,
}

/// All events of one network.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: Vec<Event>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: ComponentId, trigger: Trigger, effect: Effect) -> EventId {
        let id = EventId(self.events.len());
        self.events.push(Event {
            id,
            component,
            trigger,
            effect,
        });
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Apply the events that fired in one evaluation.
    ///
    /// Transitions whose source mode is not active or whose guard fails are
    /// ignored. If the remaining top-priority transitions of a component
    /// disagree on the target, nothing is committed and an
    /// [`KirchhoffError::EventOrderingViolation`] is returned.
    pub fn dispatch<F>(&self, fired: &[EventId], ctx: &mut EvalContext, name_of: F) -> Result<Vec<Commit>>
    where
        F: Fn(ComponentId) -> String,
    {
        let mut candidates: BTreeMap<ComponentId, Vec<&Transition>> = BTreeMap::new();

        for id in fired {
            let event = self
                .get(*id)
                .ok_or(KirchhoffError::UnknownEvent { id: id.0 })?;
            let transition = match &event.effect {
                Effect::Restart => {
                    log::debug!("{}: restart at t={}", name_of(event.component), ctx.time);
                    continue;
                }
                Effect::Transition(t) => t,
            };
            if ctx.discrete.mode(transition.mode) != Some(transition.from) {
                continue;
            }
            if !transition.guard.holds(ctx)? {
                continue;
            }
            candidates.entry(event.component).or_default().push(transition);
        }

        let mut chosen = Vec::with_capacity(candidates.len());
        for (component, list) in candidates {
            let top = list.iter().map(|t| t.priority).max().unwrap_or(0);
            let winners: Vec<&Transition> = list.into_iter().filter(|t| t.priority == top).collect();
            let Some((first, rest)) = winners.split_first() else {
                continue;
            };
            if let Some(other) = rest.iter().find(|t| t.mode != first.mode || t.to != first.to) {
                return Err(KirchhoffError::EventOrderingViolation {
                    component: name_of(component),
                    message: format!(
                        "{} -> {} and {} -> {} requested in the same evaluation at t={}",
                        first.from, first.to, other.from, other.to, ctx.time
                    ),
                });
            }
            chosen.push((component, *first));
        }

        let mut commits = Vec::with_capacity(chosen.len());
        for (component, t) in chosen {
            ctx.discrete.set_mode(t.mode, t.to);
            if let Some(clock) = t.reset {
                ctx.discrete.reset_clock(clock, ctx.time);
            }
            log::debug!("{}: {} -> {} at t={}", name_of(component), t.from, t.to, ctx.time);
            commits.push(Commit {
                component,
                mode: t.mode,
                from: t.from,
                to: t.to,
            });
        }
        Ok(commits)
    }
}
