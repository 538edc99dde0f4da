//! Interactive terminal console.
//!
//! Redraws the whole screen from the [`AppContext`] on every change and
//! turns stdin lines into [`UiEvent`]s.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use crate::controller::{AppContext, Surface, UiEvent};

// ANSI codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CLEAR: &str = "\x1b[2J\x1b[H";
const ALERT: &str = "\x1b[41;97m";

const ICON_QUAKE: &str = "🌍";
const ICON_ALERT: &str = "⚠️";

const HINT: &str = "r refresh │ c LAT LON predict │ p N popup │ q quit";

/// Screen renderer writing to a terminal.
pub struct ConsoleSurface<W: Write> {
    out: W,
    width: usize,
    height: usize,
    list_rows: usize,
    alerts: Vec<String>,
}

impl<W: Write> ConsoleSurface<W> {
    /// Canvas `width` in cells; the height follows the map's 2:1 aspect
    /// with cells about twice as tall as wide.
    pub fn new(out: W, width: usize, list_rows: usize) -> Self {
        Self {
            out,
            width,
            height: (width / 4).max(8),
            list_rows,
            alerts: Vec::new(),
        }
    }

    fn draw(&mut self, ctx: &AppContext) -> io::Result<()> {
        let out = &mut self.out;
        write!(out, "{CLEAR}")?;
        writeln!(out, "{BOLD}{ICON_QUAKE} Earthquake Risk Console{RESET}")?;
        writeln!(out, "{DIM}{}{RESET}", "─".repeat(self.width))?;

        for line in ctx.map.render_canvas(self.width, self.height, &ctx.markers) {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "{}", ctx.map.legend().render())?;
        writeln!(out, "{DIM}{}{RESET}", "─".repeat(self.width))?;

        match &ctx.last_updated {
            Some(updated) => writeln!(out, "{DIM}{updated}{RESET}")?,
            None => writeln!(out, "{DIM}Loading...{RESET}")?,
        }

        if let Some(panel) = &ctx.prediction {
            writeln!(out, "{}{}{RESET}", panel.tier.ansi(), panel.text)?;
        }

        if let Some(popup) = ctx.selected_popup() {
            writeln!(out)?;
            write!(out, "{}", popup.to_ansi())?;
        }

        writeln!(out)?;
        let rows = ctx.sidebar.rows();
        for (index, row) in rows.iter().take(self.list_rows).enumerate() {
            let ansi = row.to_ansi();
            writeln!(out, "{DIM}{index:>3}{RESET} {ansi}")?;
        }
        if rows.len() > self.list_rows {
            writeln!(out, "{DIM}    ... {} more{RESET}", rows.len() - self.list_rows)?;
        }

        for alert in self.alerts.drain(..) {
            writeln!(out, "\n{ALERT} {ICON_ALERT} {alert} {RESET}")?;
        }

        writeln!(out, "\n{DIM}{HINT}{RESET}")?;
        write!(out, "> ")?;
        out.flush()
    }
}

impl<W: Write> Surface for ConsoleSurface<W> {
    fn alert(&mut self, message: &str) {
        // bell, then shown on the next redraw
        let _ = write!(self.out, "\x07");
        self.alerts.push(message.to_string());
    }

    fn redraw(&mut self, ctx: &AppContext) {
        if let Err(e) = self.draw(ctx) {
            warn!("failed to draw console: {}", e);
        }
    }
}

/// Parse one line of operator input.
///
/// Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// Returns a usage message for unknown commands or bad arguments.
pub fn parse_command(line: &str) -> Result<Option<UiEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let event = match (command.to_lowercase().as_str(), args.as_slice()) {
        ("r" | "refresh", []) => UiEvent::Refresh,
        ("q" | "quit" | "exit", []) => UiEvent::Quit,
        ("c" | "click", [lat, lon]) => {
            let lat: f64 = lat.parse().map_err(|e| format!("invalid latitude: {e}"))?;
            let lon: f64 = lon.parse().map_err(|e| format!("invalid longitude: {e}"))?;
            UiEvent::MapClick { lat, lon }
        }
        ("p" | "popup", [index]) => {
            let index: usize = index.parse().map_err(|e| format!("invalid row: {e}"))?;
            UiEvent::SelectRow(index)
        }
        _ => return Err(format!("unknown command: {} ({HINT})", line.trim())),
    };

    Ok(Some(event))
}

/// Read commands from stdin and publish them. End of input quits.
pub fn spawn_input(tx: mpsc::Sender<UiEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("failed to read input: {}", e);
                    break;
                }
            };

            match parse_command(&line) {
                Ok(Some(event)) => {
                    debug!("input event {:?}", event);
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            }
        }

        let _ = tx.send(UiEvent::Quit).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::tests::feature;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("r").unwrap(), Some(UiEvent::Refresh));
        assert_eq!(parse_command("  Refresh ").unwrap(), Some(UiEvent::Refresh));
        assert_eq!(parse_command("q").unwrap(), Some(UiEvent::Quit));
        assert_eq!(
            parse_command("c 10.0 20.0").unwrap(),
            Some(UiEvent::MapClick {
                lat: 10.0,
                lon: 20.0
            })
        );
        assert_eq!(parse_command("popup 3").unwrap(), Some(UiEvent::SelectRow(3)));
        assert_eq!(parse_command("").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("c 10").is_err());
        assert!(parse_command("c north 20").is_err());
        assert!(parse_command("p -1").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_redraw_shows_alert_once() {
        let mut ctx = AppContext::new();
        ctx.markers.replace_all(&[feature("a", 5.0, 0.8, 0)]);
        ctx.sidebar.render(&[feature("a", 5.0, 0.8, 0)]);

        let mut surface = ConsoleSurface::new(Vec::new(), 40, 5);
        surface.alert("db down");
        surface.redraw(&ctx);
        surface.redraw(&ctx);

        let screen = String::from_utf8(surface.out).unwrap();
        assert_eq!(screen.matches("db down").count(), 1);
        assert!(screen.contains("5.0 - place a"));
        assert!(screen.contains("80.0% risk"));
        assert!(screen.contains("Risk Level"));
    }

    #[test]
    fn test_list_is_truncated() {
        let features: Vec<_> = (0..8)
            .map(|i| feature(&i.to_string(), 3.0, 0.1, i))
            .collect();
        let mut ctx = AppContext::new();
        ctx.sidebar.render(&features);

        let mut surface = ConsoleSurface::new(Vec::new(), 40, 5);
        surface.redraw(&ctx);

        let screen = String::from_utf8(surface.out).unwrap();
        assert!(screen.contains("... 3 more"));
    }
}
