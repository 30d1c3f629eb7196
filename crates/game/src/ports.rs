//! Collaborators the save and level code call out to. Dialog content and the
//! load-failure banner live outside this crate; callers pass them in.

use thiserror::Error;

use crate::world::{Enemy, Npc};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NarrativeError {
    #[error("dialog {dialog_id:?} is not available")]
    DialogUnavailable { dialog_id: String },
    #[error("no intro is registered for {vn_id:?}")]
    IntroUnavailable { vn_id: String },
}

pub trait NarrativeAttachment {
    fn attach_dialog(&mut self, npc: &mut Npc, dialog_id: &str) -> Result<(), NarrativeError>;

    /// Hooks the one-time intro beat onto an enemy that carries a `vn_id`.
    fn attach_intro(&mut self, enemy: &mut Enemy) -> Result<(), NarrativeError>;
}

pub trait LoadFailureNotifier {
    fn report_load_failure(&mut self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNarrative;

impl NarrativeAttachment for NoopNarrative {
    fn attach_dialog(&mut self, _npc: &mut Npc, _dialog_id: &str) -> Result<(), NarrativeError> {
        Ok(())
    }

    fn attach_intro(&mut self, _enemy: &mut Enemy) -> Result<(), NarrativeError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl LoadFailureNotifier for NoopNotifier {
    fn report_load_failure(&mut self, _message: &str) {}
}

pub struct Ports<'a> {
    pub narrative: &'a mut dyn NarrativeAttachment,
    pub notifier: &'a mut dyn LoadFailureNotifier,
}

impl<'a> Ports<'a> {
    pub fn new(
        narrative: &'a mut dyn NarrativeAttachment,
        notifier: &'a mut dyn LoadFailureNotifier,
    ) -> Self {
        Self {
            narrative,
            notifier,
        }
    }
}
