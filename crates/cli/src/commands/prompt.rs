//! Line-based terminal input shared by the shell and confirmation dialogs.

use medico_client::notify::{ConfirmDialogs, ConfirmRequest};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::output;

pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next input line, or `None` at end of input.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }

    /// Ask `label` and read the answer.
    pub async fn ask(&mut self, label: &str) -> std::io::Result<String> {
        output::ask(label);
        Ok(self.read_line().await?.unwrap_or_default())
    }

    /// Present `request` through the dialog queue and wait for a y/N answer.
    pub async fn confirm(
        &mut self,
        dialogs: &ConfirmDialogs,
        request: ConfirmRequest,
    ) -> std::io::Result<bool> {
        let pending = dialogs.show(request);
        if let Some(dialog) = dialogs.current() {
            output::dialog(&dialog);
        }

        let answer = self.read_line().await?.unwrap_or_default();
        if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            dialogs.confirm(pending.id());
        } else {
            dialogs.cancel(pending.id());
        }
        Ok(pending.decision().await)
    }
}
