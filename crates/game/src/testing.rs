use crate::ports::{LoadFailureNotifier, NarrativeAttachment, NarrativeError};
use crate::world::{Enemy, Npc};

#[derive(Debug, Default)]
pub(crate) struct RecordingNarrative {
    pub fail_dialogs: bool,
    pub dialog_attempts: Vec<String>,
    pub intros: Vec<String>,
}

impl RecordingNarrative {
    pub fn failing_dialogs() -> Self {
        Self {
            fail_dialogs: true,
            ..Self::default()
        }
    }
}

impl NarrativeAttachment for RecordingNarrative {
    fn attach_dialog(&mut self, _npc: &mut Npc, dialog_id: &str) -> Result<(), NarrativeError> {
        self.dialog_attempts.push(dialog_id.to_string());
        if self.fail_dialogs {
            return Err(NarrativeError::DialogUnavailable {
                dialog_id: dialog_id.to_string(),
            });
        }
        Ok(())
    }

    fn attach_intro(&mut self, enemy: &mut Enemy) -> Result<(), NarrativeError> {
        let vn_id = enemy.vn_id.clone().unwrap_or_default();
        self.intros.push(vn_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub failures: Vec<String>,
}

impl LoadFailureNotifier for RecordingNotifier {
    fn report_load_failure(&mut self, message: &str) {
        self.failures.push(message.to_string());
    }
}
