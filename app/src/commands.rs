use anyhow::Context;
use config::{Keychain, RUNE_SECRET_KEY};
use invoice_sync::{InvoiceStore, UpdateBus};
use lnw_core::selection::rows_from_indexes;
use std::collections::BTreeSet;
use std::future::Future;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::view::InvoicesView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    List,
    /// Selected cells as `(row, column)`; a bare row number selects column 0.
    Select(Vec<(usize, usize)>),
    Rune(RuneAction),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuneAction {
    Set(String),
    Clear,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };
    match verb {
        "refresh" | "r" => Ok(Command::Refresh),
        "list" | "ls" => Ok(Command::List),
        "select" | "s" => {
            let cells = words.map(parse_cell).collect::<Result<Vec<_>, _>>()?;
            Ok(Command::Select(cells))
        }
        "rune" => match (words.next(), words.next(), words.next()) {
            (Some("set"), Some(rune), None) => Ok(Command::Rune(RuneAction::Set(rune.to_string()))),
            (Some("clear"), None, None) => Ok(Command::Rune(RuneAction::Clear)),
            _ => Err("usage: rune set <rune> | rune clear".to_string()),
        },
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_cell(token: &str) -> Result<(usize, usize), String> {
    let (row, col) = token.split_once(':').unwrap_or((token, "0"));
    let row = row
        .parse()
        .map_err(|_| format!("bad row number: {token}"))?;
    let col = col
        .parse()
        .map_err(|_| format!("bad column number: {token}"))?;
    Ok((row, col))
}

const HELP: &str = "\
commands:
  refresh            ask every component to pull fresh data
  list               print the invoice table
  select <row>...    select rows (or row:col cells); shows details for one row
  rune set <rune>    keep the lightningd rune in the OS keychain
  rune clear         forget the stored rune
  quit               leave";

/// Reads stdin lines on a plain OS thread and forwards them over a channel.
///
/// A read blocked there does not keep the runtime alive at shutdown; the
/// thread ends with the process.
pub fn spawn_stdin_reader() -> anyhow::Result<mpsc::Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start stdin reader")?;
    Ok(rx)
}

/// Where the `rune` commands keep the node credential.
pub struct Credentials {
    pub keychain: Keychain,
    pub config_path: PathBuf,
}

impl Credentials {
    fn set_rune(&self, rune: &str) -> anyhow::Result<()> {
        self.keychain.store_secret(RUNE_SECRET_KEY, rune)?;
        self.drop_inline_rune()?;
        Ok(())
    }

    fn clear_rune(&self) -> anyhow::Result<bool> {
        let from_keychain = self.keychain.delete_secret(RUNE_SECRET_KEY)?;
        let from_file = self.drop_inline_rune()?;
        Ok(from_keychain || from_file)
    }

    /// A rune written in the config file is read before the keychain one, so
    /// it has to go for the keychain value to take effect.
    fn drop_inline_rune(&self) -> anyhow::Result<bool> {
        let mut cfg = config::load_from(&self.config_path)?;
        if cfg.lightningd.rune.take().is_none() {
            return Ok(false);
        }
        config::store_to(&self.config_path, &cfg)?;
        tracing::info!(path = %self.config_path.display(), "Removed inline rune from config file");
        Ok(true)
    }
}

/// Console stand-in for the invoices window: keyboard commands arrive as
/// lines, and the table re-renders whenever the store reports a change.
pub struct Console {
    pub bus: UpdateBus,
    pub store: Arc<InvoiceStore>,
    pub view: InvoicesView,
    pub credentials: Credentials,
}

impl Console {
    /// Runs until `quit`, end of input, a closed store or `shutdown` resolving.
    pub async fn run(
        &mut self,
        mut input: mpsc::Receiver<io::Result<String>>,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        tokio::pin!(shutdown);
        let mut changes = self.store.subscribe();
        self.view.reset(self.store.get());
        println!("{HELP}");

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = Arc::clone(&changes.borrow_and_update());
                    self.view.reset(snapshot);
                    tracing::info!(rows = self.view.table.row_count(), "invoice list changed");
                    print!("{}", self.view.table.render());
                }
                line = input.recv() => {
                    let Some(line) = line else {
                        break;
                    };
                    let line = line.context("Failed to read console input")?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_command(&line) {
                        Ok(Command::Quit) => break,
                        Ok(cmd) => self.execute(cmd),
                        Err(e) => println!("{e}"),
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("interrupted");
                    break;
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, cmd: Command) {
        match cmd {
            Command::Refresh => {
                let n = self.bus.publish();
                tracing::debug!(handlers = n, "manual refresh");
            }
            Command::List => print!("{}", self.view.table.render()),
            Command::Select(cells) => {
                let rows: BTreeSet<usize> = rows_from_indexes(cells);
                self.view.select_rows(rows);
                tracing::debug!(rows = ?self.view.selection(), "selection changed");
                if self.view.detail.is_blank() {
                    println!("select exactly one row to see its details");
                } else {
                    print!("{}", self.view.detail.render());
                }
            }
            Command::Rune(RuneAction::Set(rune)) => match self.credentials.set_rune(&rune) {
                Ok(()) => println!("rune stored, used from the next start"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to store rune");
                    println!("could not store rune: {e:#}");
                }
            },
            Command::Rune(RuneAction::Clear) => match self.credentials.clear_rune() {
                Ok(true) => println!("rune removed"),
                Ok(false) => println!("no rune was stored"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to clear rune");
                    println!("could not clear rune: {e:#}");
                }
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
    }
}
