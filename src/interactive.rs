//! Line-driven terminal front end
//!
//! Reads commands from stdin, forwards them to the controller and renders
//! the events it sends back. Ctrl-C cancels a running batch, or quits when
//! nothing is running.

use crate::controller::{Controller, UiEvent, UserAction};
use crate::orchestrator::EVENT_CHANNEL_CAPACITY;
use crate::output::TextFormatter;
use crate::update::{SelectionState, UpdateCatalog};
use log::debug;
use std::collections::VecDeque;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  <n> [<n>...]  toggle package number n
  a             select all
  c             clear selection
  u             upgrade selected packages
  r             refresh the listing
  l             show the list again
  x             cancel running upgrades
  q             quit";

/// Parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Actions to forward, in order
    Actions(Vec<UserAction>),
    /// Redraw the list
    Show,
    /// Print the command summary
    Help,
    /// Nothing to do
    Empty,
    /// Could not be understood
    Invalid(String),
}

/// Parse one input line against the rows currently shown
pub fn parse_input(line: &str, catalog: &UpdateCatalog) -> Input {
    let line = line.trim();
    let action = match line.to_lowercase().as_str() {
        "" => return Input::Empty,
        "a" | "all" => UserAction::SelectAll,
        "c" | "clear" => UserAction::Clear,
        "u" | "upgrade" => UserAction::Upgrade,
        "r" | "refresh" => UserAction::Refresh,
        "x" | "cancel" => UserAction::Cancel,
        "q" | "quit" | "exit" => UserAction::Quit,
        "l" | "list" => return Input::Show,
        "h" | "?" | "help" => return Input::Help,
        _ => return parse_numbers(line, catalog),
    };
    Input::Actions(vec![action])
}

fn parse_numbers(line: &str, catalog: &UpdateCatalog) -> Input {
    let mut actions = Vec::new();
    for token in line.split([' ', ',']).filter(|t| !t.is_empty()) {
        let Ok(number) = token.parse::<usize>() else {
            return Input::Invalid(format!("Unknown command '{}', type h for help", token));
        };
        match number.checked_sub(1).and_then(|i| catalog.records().get(i)) {
            Some(record) => actions.push(UserAction::Toggle(record.id.clone())),
            None => return Input::Invalid(format!("No package number {}", number)),
        }
    }
    Input::Actions(actions)
}

/// Capacity of the action channel to the controller
const ACTION_CHANNEL_CAPACITY: usize = 16;

/// What the front end shows
struct View {
    formatter: TextFormatter,
    out: Box<dyn Write + Send>,
    catalog: UpdateCatalog,
    selection: SelectionState,
    busy: bool,
}

impl View {
    fn new(formatter: TextFormatter, out: Box<dyn Write + Send>) -> Self {
        Self {
            formatter,
            out,
            catalog: UpdateCatalog::default(),
            selection: SelectionState::default(),
            busy: false,
        }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        let text = self.formatter.notice_line(message);
        self.line(&text)
    }

    fn show_list(&mut self) -> io::Result<()> {
        for row in self.formatter.catalog_table(&self.catalog, Some(&self.selection)) {
            writeln!(self.out, "{}", row)?;
        }
        if !self.catalog.is_empty() {
            writeln!(self.out, "{} selected", self.selection.len())?;
        }
        self.out.flush()
    }

    /// Turn one input line into queued actions
    fn read_line(&mut self, line: &str, queue: &mut VecDeque<UserAction>) -> io::Result<()> {
        match parse_input(line, &self.catalog) {
            Input::Actions(actions) => queue.extend(actions),
            Input::Show => self.show_list()?,
            Input::Help => self.line(HELP)?,
            Input::Empty => {}
            Input::Invalid(message) => self.notice(&message)?,
        }
        Ok(())
    }

    fn apply(&mut self, event: UiEvent) -> io::Result<()> {
        match event {
            UiEvent::Refreshing => self.line("Scanning for upgrades...")?,
            UiEvent::CatalogChanged(catalog) => {
                self.selection = SelectionState::for_catalog(&catalog);
                self.catalog = catalog;
            }
            UiEvent::SelectionChanged(ids) => {
                self.selection.select_all(ids.iter().map(String::as_str));
                if !self.busy {
                    self.show_list()?;
                }
            }
            UiEvent::UpgradeStarted {
                package_id,
                index,
                total,
            } => {
                self.busy = true;
                let text = self.formatter.started_line(&package_id, index, total);
                self.line(&text)?;
            }
            UiEvent::LogLine { package_id, text } => {
                if !text.trim().is_empty() {
                    let text = self.formatter.log_line(&package_id, &text);
                    self.line(&text)?;
                }
            }
            UiEvent::Outcome(outcome) => {
                let text = self.formatter.outcome_line(&outcome);
                self.line(&text)?;
            }
            UiEvent::SessionComplete(result) => {
                self.busy = false;
                let text = self.formatter.summary_line(&result);
                self.line(&text)?;
                self.show_list()?;
            }
            UiEvent::Notice(message) => self.notice(&message)?,
            UiEvent::RefreshFailed(message) => {
                self.notice(&format!("Refresh failed: {}", message))?;
            }
        }
        Ok(())
    }
}

/// Run the interactive front end on stdin and stdout until the controller stops
pub async fn run(
    controller: Controller,
    formatter: TextFormatter,
    notices: &[String],
) -> io::Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    drive(controller, formatter, notices, input, Box::new(io::stdout())).await
}

/// Front-end loop over any line source and output
///
/// Actions wait in a local queue and are handed over only when the controller
/// has room, so rendering its events and watching for Ctrl-C never stall
/// behind a full action channel.
async fn drive<R>(
    controller: Controller,
    formatter: TextFormatter,
    notices: &[String],
    input: R,
    out: Box<dyn Write + Send>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let (actions_tx, actions_rx) = mpsc::channel(ACTION_CHANNEL_CAPACITY);
    let (ui_tx, mut ui_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let control = tokio::spawn(controller.run(actions_rx, ui_tx));

    let mut view = View::new(formatter, out);
    for notice in notices {
        view.notice(notice)?;
    }
    view.line(HELP)?;

    let mut lines = input.lines();
    let mut input_open = true;
    let mut queue: VecDeque<UserAction> = VecDeque::new();

    loop {
        tokio::select! {
            event = ui_rx.recv() => match event {
                Some(event) => view.apply(event)?,
                None => break,
            },
            permit = actions_tx.reserve(), if !queue.is_empty() => match permit {
                Ok(permit) => {
                    if let Some(action) = queue.pop_front() {
                        permit.send(action);
                    }
                }
                Err(_) => {
                    debug!("Controller stopped, dropping {} queued action(s)", queue.len());
                    queue.clear();
                }
            },
            line = lines.next_line(), if input_open => match line? {
                Some(line) => view.read_line(&line, &mut queue)?,
                None => {
                    input_open = false;
                    queue.push_back(UserAction::Quit);
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                // Interrupts jump the queue
                let action = if view.busy { UserAction::Cancel } else { UserAction::Quit };
                queue.push_front(action);
            },
        }
    }

    if let Err(e) = control.await {
        debug!("Controller task ended abnormally: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::WingetBackend;
    use crate::controller::ListingSource;
    use crate::domain::PackageRecord;
    use crate::output::Verbosity;
    use crate::process::testing::{Script, ScriptedLauncher};
    use crate::update::CatalogFilter;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    const LISTING: &[&str] = &[
        "Name               Id                 Version  Available  Source",
        "--------------------------------------------------------------------",
        "Git                Git.Git            2.43.0   2.44.0     winget",
        "Node.js LTS        OpenJS.NodeJS.LTS  20.11.0  20.11.1    winget",
    ];

    /// Output buffer readable while the front end writes to it
    #[derive(Clone, Default)]
    struct SharedOutput(Arc<Mutex<Vec<u8>>>);

    impl SharedOutput {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn catalog() -> UpdateCatalog {
        UpdateCatalog::build(
            vec![
                PackageRecord::new("Git", "Git.Git", "2.43.0", "2.44.0", "winget"),
                PackageRecord::new("Node.js", "OpenJS.NodeJS", "20.0", "21.0", "winget"),
            ],
            &CatalogFilter::new("winget"),
        )
    }

    #[test]
    fn test_parse_commands() {
        let catalog = catalog();
        assert_eq!(parse_input("a", &catalog), Input::Actions(vec![UserAction::SelectAll]));
        assert_eq!(parse_input(" U ", &catalog), Input::Actions(vec![UserAction::Upgrade]));
        assert_eq!(parse_input("quit", &catalog), Input::Actions(vec![UserAction::Quit]));
        assert_eq!(parse_input("x", &catalog), Input::Actions(vec![UserAction::Cancel]));
        assert_eq!(parse_input("l", &catalog), Input::Show);
        assert_eq!(parse_input("?", &catalog), Input::Help);
        assert_eq!(parse_input("   ", &catalog), Input::Empty);
    }

    #[test]
    fn test_parse_row_numbers() {
        assert_eq!(
            parse_input("2, 1", &catalog()),
            Input::Actions(vec![
                UserAction::Toggle("OpenJS.NodeJS".to_string()),
                UserAction::Toggle("Git.Git".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_out_of_range() {
        assert!(matches!(parse_input("0", &catalog()), Input::Invalid(_)));
        assert!(matches!(parse_input("3", &catalog()), Input::Invalid(_)));
    }

    #[test]
    fn test_parse_unknown_word() {
        assert!(matches!(parse_input("upgrade-all", &catalog()), Input::Invalid(_)));
    }

    #[tokio::test]
    async fn test_long_input_line_does_not_stall_front_end() {
        let launcher = Arc::new(ScriptedLauncher::new(|cmd| {
            if cmd.args[0] == "list" {
                Script::exit(0, LISTING)
            } else {
                Script::exit(0, &[])
            }
        }));
        let controller = Controller::new(
            Arc::new(WingetBackend::default()),
            launcher,
            CatalogFilter::new("winget"),
            ListingSource::Live {
                timeout: Duration::from_secs(5),
            },
        );
        let output = SharedOutput::default();
        let (mut keyboard, input) = tokio::io::duplex(64 * 1024);

        // Far more toggles than either channel holds, typed once the list is shown
        let typist_output = output.clone();
        let typist = tokio::spawn(async move {
            while !typist_output.text().contains("0 selected") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let toggles = vec!["1"; 300].join(" ");
            keyboard
                .write_all(format!("{toggles}\nq\n").as_bytes())
                .await
                .unwrap();
            keyboard
        });

        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            drive(
                controller,
                TextFormatter::with_color(Verbosity::Normal, false),
                &[],
                BufReader::new(input),
                Box::new(output.clone()),
            ),
        )
        .await;
        assert!(finished.is_ok(), "front end stopped making progress");
        finished.unwrap().unwrap();
        let _keyboard = typist.await.unwrap();

        let text = output.text();
        assert!(text.contains("1 selected"));
        assert!(text.trim_end().ends_with("0 selected"));
    }
}
