use super::{InteractiveShell, PROMPT};
use rustyline::{error::ReadlineError, DefaultEditor};

impl InteractiveShell {
    /// Reads one line from the prompt. `Ok(None)` means the line was abandoned with Ctrl + C.
    pub(crate) fn readln(
        &mut self,
        editor: &mut DefaultEditor,
    ) -> Result<Option<String>, ReadlineError> {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.bytes().any(|c| !c.is_ascii_whitespace()) {
                    editor.add_history_entry(line.as_str()).ok();
                }
                Ok(Some(line))
            }
            // Handles Ctrl + C
            Err(ReadlineError::Interrupted) => Ok(None),
            Err(why) => Err(why),
        }
    }
}
