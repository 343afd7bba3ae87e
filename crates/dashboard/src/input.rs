use anyhow::Context;
use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use usalpha_core::app::event::UiEvent;

pub const HELP: &str = "commands: select <TICKER> | period <1m|3m|6m|1y|2y|5y> | toggle <rsi|macd|bb|sr> \
| tab <sectors|options|risk|calendar> | history <YYYY-MM-DD|latest> | lang | model | dismiss <id> | reload | quit";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Event(UiEvent),
    Quit,
}

/// Parses one line of input. Blank lines yield `None`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let need = |what: &str| arg.with_context(|| format!("{verb} needs {what}"));

    let event = match verb.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => return Ok(Some(Command::Quit)),
        "select" => UiEvent::SelectPick(need("a ticker")?.to_ascii_uppercase()),
        "period" => UiEvent::ChangePeriod(need("a period")?.parse()?),
        "toggle" => UiEvent::ToggleIndicator(need("an indicator")?.parse()?),
        "tab" => UiEvent::SwitchTab(need("a tab")?.parse()?),
        "history" => match need("a date")? {
            "latest" => UiEvent::SelectHistoryDate(None),
            date => UiEvent::SelectHistoryDate(Some(
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .with_context(|| format!("not a date: {date}"))?,
            )),
        },
        "lang" => UiEvent::ToggleLanguage,
        "model" => UiEvent::ToggleModel,
        "dismiss" => UiEvent::DismissNotification(
            need("a notification id")?
                .parse()
                .context("notification id must be a number")?,
        ),
        "reload" => UiEvent::Reload,
        other => anyhow::bail!("unknown command: {other}"),
    };
    Ok(Some(Command::Event(event)))
}

/// Forwards stdin commands as UI events until `quit` or end of input.
pub async fn pump(events: mpsc::UnboundedSender<UiEvent>, quit: oneshot::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stdin");
                break;
            }
        };

        match parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Event(event))) => {
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "ignoring command");
                eprintln!("{err:#}\n{HELP}");
            }
        }
    }
    let _ = quit.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use usalpha_core::app::event::Tab;
    use usalpha_core::domain::chart::{ChartPeriod, IndicatorKind};

    fn event(line: &str) -> UiEvent {
        match parse(line).unwrap() {
            Some(Command::Event(event)) => event,
            other => panic!("expected an event for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_every_command() {
        assert_eq!(event("select aapl"), UiEvent::SelectPick("AAPL".into()));
        assert_eq!(event("period 1y"), UiEvent::ChangePeriod(ChartPeriod::OneYear));
        assert_eq!(event("toggle bb"), UiEvent::ToggleIndicator(IndicatorKind::Bollinger));
        assert_eq!(event("tab risk"), UiEvent::SwitchTab(Tab::Risk));
        assert_eq!(
            event("history 2025-01-02"),
            UiEvent::SelectHistoryDate(NaiveDate::from_ymd_opt(2025, 1, 2))
        );
        assert_eq!(event("history latest"), UiEvent::SelectHistoryDate(None));
        assert_eq!(event("lang"), UiEvent::ToggleLanguage);
        assert_eq!(event("MODEL"), UiEvent::ToggleModel);
        assert_eq!(event("dismiss 3"), UiEvent::DismissNotification(3));
        assert_eq!(event("  reload  "), UiEvent::Reload);
        assert_eq!(parse("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("select").is_err());
        assert!(parse("period 10y").is_err());
        assert!(parse("history yesterday").is_err());
        assert!(parse("dismiss x").is_err());
        assert!(parse("fly").is_err());
    }
}
