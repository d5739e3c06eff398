//! Side effects produced by one session step

use crate::ws::protocol::{PlayerId, ServerMsg};

use super::timer::TimerKind;

/// Who receives an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    All,
    AllExcept(PlayerId),
    Only(PlayerId),
}

impl Recipients {
    pub fn includes(&self, id: &PlayerId) -> bool {
        match self {
            Recipients::All => true,
            Recipients::AllExcept(excluded) => excluded != id,
            Recipients::Only(target) => target == id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipients,
    pub msg: ServerMsg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Start (or restart) the timer, cancelling any running one of the same kind
    Start(TimerKind),
    Cancel(TimerKind),
}

/// Everything a step wants done, in order
#[derive(Debug, Default)]
pub struct Effects {
    pub outbound: Vec<Outbound>,
    pub timers: Vec<TimerCommand>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&mut self, msg: ServerMsg) {
        self.push(Recipients::All, msg);
    }

    pub fn broadcast_except(&mut self, sender: &PlayerId, msg: ServerMsg) {
        self.push(Recipients::AllExcept(sender.clone()), msg);
    }

    pub fn send_to(&mut self, target: &PlayerId, msg: ServerMsg) {
        self.push(Recipients::Only(target.clone()), msg);
    }

    pub fn start_timer(&mut self, kind: TimerKind) {
        self.timers.push(TimerCommand::Start(kind));
    }

    pub fn cancel_timer(&mut self, kind: TimerKind) {
        self.timers.push(TimerCommand::Cancel(kind));
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.timers.is_empty()
    }

    /// Messages a given player would receive, in order
    pub fn delivered_to(&self, id: &PlayerId) -> impl Iterator<Item = &ServerMsg> + '_ {
        let id = id.clone();
        self.outbound
            .iter()
            .filter(move |out| out.to.includes(&id))
            .map(|out| &out.msg)
    }

    fn push(&mut self, to: Recipients, msg: ServerMsg) {
        self.outbound.push(Outbound { to, msg });
    }
}
