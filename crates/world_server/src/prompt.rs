//! Interactive load prompt.

use std::io::{self, BufRead, Write};

use tracing::warn;
use world_entity::{EntityKind, Serial, TypeIssue};
use world_store::{LoadDecision, LoadPrompt};

/// Asks the operator on a terminal. Anything but `y` aborts the load.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> LoadDecision {
        if let Err(error) = write!(self.output, "{question} (y/n) ").and_then(|()| self.output.flush()) {
            warn!(%error, "failed to write prompt");
            return LoadDecision::Abort;
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(_) if line.trim().eq_ignore_ascii_case("y") => LoadDecision::Discard,
            Ok(_) => LoadDecision::Abort,
            Err(error) => {
                warn!(%error, "failed to read answer");
                LoadDecision::Abort
            }
        }
    }
}

impl<R: BufRead, W: Write> LoadPrompt for ConsolePrompt<R, W> {
    fn unresolved_type(&mut self, kind: EntityKind, name: &str, issue: &TypeIssue) -> LoadDecision {
        self.ask(&format!(
            "Error loading {kind}: type '{name}' is {issue}.\nDelete all {kind} of this type?"
        ))
    }

    fn corrupt_entity(
        &mut self,
        kind: EntityKind,
        serial: Serial,
        type_name: &str,
        reason: &str,
    ) -> LoadDecision {
        self.ask(&format!(
            "Error loading {type_name} {serial} from {kind}: {reason}.\nDelete this entity?"
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_yes_discards() {
        let mut output = Vec::new();
        let mut prompt = ConsolePrompt::new(Cursor::new("y\n"), &mut output);
        let decision = prompt.unresolved_type(EntityKind::Item, "Foo.Bar", &TypeIssue::NotFound);
        assert_eq!(decision, LoadDecision::Discard);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("type 'Foo.Bar' is not found"));
    }

    #[test]
    fn test_anything_else_aborts() {
        for answer in ["n\n", "yes please\n", ""] {
            let mut prompt = ConsolePrompt::new(Cursor::new(answer), Vec::new());
            let decision =
                prompt.corrupt_entity(EntityKind::Mobile, Serial(3), "Mobiles.PlayerMobile", "truncated");
            assert_eq!(decision, LoadDecision::Abort, "answer {answer:?}");
        }
    }
}
