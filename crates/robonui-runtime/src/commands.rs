//! [`CommandSource`] – where operator commands enter the system.

use robonui_middleware::{Provider, Publisher};
use robonui_types::{RoboNuiError, StateCommand};
use tracing::info;

pub struct CommandSource {
    provider: Provider<StateCommand>,
}

impl Default for CommandSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSource {
    pub fn new() -> Self {
        Self {
            provider: Provider::new("command-source"),
        }
    }

    /// Parse one operator line: either a phrase such as `side left` or a
    /// JSON object such as `{"command":"Activation","argument":true}`.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::UnknownCommand`] if the line is neither.
    pub fn parse(line: &str) -> Result<StateCommand, RoboNuiError> {
        let line = line.trim();
        if line.starts_with('{') {
            serde_json::from_str(line)
                .map_err(|e| RoboNuiError::UnknownCommand(format!("bad command JSON: {e}")))
        } else {
            line.parse()
        }
    }

    /// Deliver `command` to every registered consumer.
    pub fn issue(&self, command: StateCommand) -> Result<usize, RoboNuiError> {
        info!(%command, "command issued");
        self.provider.send(&command)
    }

    /// [`parse`][Self::parse] then [`issue`][Self::issue].
    pub fn issue_line(&self, line: &str) -> Result<StateCommand, RoboNuiError> {
        let command = Self::parse(line)?;
        self.issue(command)?;
        Ok(command)
    }
}

impl Publisher<StateCommand> for CommandSource {
    fn provider(&self) -> &Provider<StateCommand> {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robonui_middleware::Consumer;
    use robonui_types::{ServoControllerKind, Side};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log(Mutex<Vec<StateCommand>>);

    impl Consumer<StateCommand> for Log {
        fn update(&self, value: &StateCommand) -> Result<(), RoboNuiError> {
            self.0.lock().unwrap().push(*value);
            Ok(())
        }
    }

    #[test]
    fn phrases_and_json_both_parse() {
        assert_eq!(
            CommandSource::parse("  side left ").unwrap(),
            StateCommand::SideSelection(Side::Left)
        );
        assert_eq!(
            CommandSource::parse(r#"{"command":"ServoControllerSelect","argument":"marionette"}"#)
                .unwrap(),
            StateCommand::ServoControllerSelect(ServoControllerKind::Marionette)
        );
        assert!(matches!(
            CommandSource::parse(r#"{"command":"Dance"}"#),
            Err(RoboNuiError::UnknownCommand(_))
        ));
    }

    #[test]
    fn issue_line_reaches_consumers_when_active() {
        let source = CommandSource::new();
        let log = Arc::new(Log::default());
        source.add_consumer(log.clone());

        source.issue_line("activate").unwrap();
        assert!(log.0.lock().unwrap().is_empty());

        source.activate();
        source.issue_line("track 3").unwrap();
        assert_eq!(*log.0.lock().unwrap(), vec![StateCommand::ControllerIdSelect(3)]);
    }

    #[test]
    fn unparseable_line_is_not_issued() {
        let source = CommandSource::new();
        let log = Arc::new(Log::default());
        source.add_consumer(log.clone());
        source.activate();

        assert!(source.issue_line("jump").is_err());
        assert!(log.0.lock().unwrap().is_empty());
    }
}
