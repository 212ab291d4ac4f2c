//! Interactive session management

use std::collections::BTreeMap;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use speedstore::SpeedStore;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::coordinator::{CoordCommand, Coordinator, CoordinatorHandle};
use crate::page::{self, DocumentUpdate, DomNode, MediaKind, PageDocument, PageHandle, PageId};
use crate::protocol::{self, PageNotice, PageRequest, SpeedReply};
use crate::speed::{PRESET_SPEEDS, SpeedValue, TriggerKind};

/// Interactive session: one store, one coordinator, and however many
/// simulated pages the user opens. Plays the part of browser, pages, and
/// control surface at once so the whole triad can be driven from a prompt.
pub struct Session {
    config: Config,
    store: SpeedStore,
    coordinator: CoordinatorHandle,
    coordinator_task: JoinHandle<()>,
    pages: BTreeMap<PageId, PageHandle>,
    next_page: u64,
}

impl Session {
    /// Open the store and start the coordinator.
    pub fn start(config: Config) -> Result<Self> {
        let store = SpeedStore::open(&config.store_path)?;
        let coordinator = Coordinator::new(config.coordinator.clone(), store.clone());
        let handle = coordinator.handle();
        let coordinator_task = tokio::spawn(coordinator.run());

        Ok(Self {
            config,
            store,
            coordinator: handle,
            coordinator_task,
            pages: BTreeMap::new(),
            next_page: 0,
        })
    }

    /// Run the session main loop.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", "sd>".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else if let Err(err) = self.handle_command(input).await {
                        println!("{} {}", "error:".red(), err);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.teardown().await;
        println!("Goodbye!");
        Ok(())
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "speedsync interactive session".bright_cyan().bold());
        println!("Store: {}", self.config.store_path.display());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Handle slash commands
    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/status" | "/s" => {
                if let Err(err) = self.print_status().await {
                    println!("{} {}", "error:".red(), err);
                }
                SlashResult::Continue
            }
            "/pages" | "/p" => {
                self.print_pages().await;
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Session Commands:".bright_cyan());
        println!("  {:22} Show this help", "/help".yellow());
        println!("  {:22} Exit the session", "/quit".yellow());
        println!("  {:22} Coordinator status and metrics", "/status".yellow());
        println!("  {:22} List open pages and their media", "/pages".yellow());
        println!();
        println!("{}", "Page Commands:".bright_cyan());
        println!("  {:22} Open a page with one video and focus it", "open [name]".yellow());
        println!("  {:22} Close a page", "close <name>".yellow());
        println!("  {:22} Focus a page (triggers resolve against it)", "focus <name>".yellow());
        println!("  {:22} Drop focus", "blur".yellow());
        println!("  {:22} Insert media into a page", "grow <name> [video|audio]".yellow());
        println!("  {:22} Detach a media element", "detach <name> <element>".yellow());
        println!();
        println!("{}", "Triggers:".bright_cyan());
        println!("  {:22} Step speed up on the focused page", "+ | increase".yellow());
        println!("  {:22} Step speed down", "- | decrease".yellow());
        println!("  {:22} Reset to default speed", "0 | reset".yellow());
        println!();
        println!("{}", "Control Surface:".bright_cyan());
        println!("  {:22} Read the focused page's speed", "get".yellow());
        println!("  {:22} Set a speed on the focused page", "set <value>".yellow());
        println!("  {:22} Apply a preset speed (1-4)", "preset <n>".yellow());
        println!("  {:22} Send a raw protocol message", "raw <json>".yellow());
        println!();
    }

    /// Handle non-slash commands
    async fn handle_command(&mut self, input: &str) -> Result<()> {
        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match command {
            "open" => self.cmd_open(args.first().copied()).await,
            "close" => {
                let name = args.first().ok_or_else(|| eyre::eyre!("Usage: close <name>"))?;
                self.cmd_close(name).await
            }
            "focus" => {
                let name = args.first().ok_or_else(|| eyre::eyre!("Usage: focus <name>"))?;
                if !self.pages.contains_key(*name) {
                    return Err(eyre::eyre!("No such page: {}", name));
                }
                self.coordinator.set_active(Some(name.to_string())).await?;
                println!("{} Focused {}", "✓".green(), name.cyan());
                Ok(())
            }
            "blur" => {
                self.coordinator.set_active(None).await?;
                println!("{} Focus dropped", "✓".green());
                Ok(())
            }
            "grow" => {
                let name = args.first().ok_or_else(|| eyre::eyre!("Usage: grow <name> [video|audio]"))?;
                let page = self.page(name)?;
                let node = match args.get(1).copied() {
                    None | Some("video") => DomNode::wrapped_video(),
                    Some("audio") => DomNode::Media(MediaKind::Audio),
                    Some(other) => return Err(eyre::eyre!("Unknown media kind: {}", other)),
                };
                page.mutate(DocumentUpdate::Insert(node)).await?;
                println!("{} Media added to {} (applies after settle)", "✓".green(), name.cyan());
                Ok(())
            }
            "detach" => {
                let name = args.first().ok_or_else(|| eyre::eyre!("Usage: detach <name> <element>"))?;
                let element: u64 = args
                    .get(1)
                    .ok_or_else(|| eyre::eyre!("Usage: detach <name> <element>"))?
                    .parse()
                    .map_err(|_| eyre::eyre!("Element id must be a number"))?;
                let page = self.page(name)?;
                page.mutate(DocumentUpdate::Detach(element)).await?;
                println!("{} Detached element #{} from {}", "✓".green(), element, name.cyan());
                Ok(())
            }
            "get" => self.cmd_get().await,
            "set" => self.cmd_set(args.first().copied()).await,
            "preset" => self.cmd_preset(args.first().copied()).await,
            "raw" => {
                let json = input.strip_prefix("raw").unwrap_or("").trim();
                self.cmd_raw(json).await
            }
            trigger if trigger.parse::<TriggerKind>().is_ok() => {
                let kind: TriggerKind = trigger.parse()?;
                self.coordinator.trigger(kind).await?;
                println!("{} Trigger {} dispatched", "✓".green(), kind.to_string().yellow());
                Ok(())
            }
            other => {
                println!("{} Unknown command: {}", "?".yellow(), other);
                println!("Type {} for available commands", "/help".yellow());
                Ok(())
            }
        }
    }

    async fn cmd_open(&mut self, name: Option<&str>) -> Result<()> {
        let id = match name {
            Some(name) => name.to_string(),
            None => {
                self.next_page += 1;
                format!("page-{}", self.next_page)
            }
        };
        if self.pages.contains_key(&id) {
            return Err(eyre::eyre!("Page {} is already open", id));
        }

        let document = PageDocument::with_media(&[MediaKind::Video]);
        let page = page::spawn(
            id.clone(),
            document,
            self.store.clone(),
            Some(self.coordinator.notice_sink()),
            self.config.page.clone(),
        );

        self.coordinator.register(page.clone()).await?;
        self.coordinator.set_active(Some(id.clone())).await?;
        self.pages.insert(id.clone(), page);

        println!("{} Opened {} (focused)", "✓".green(), id.cyan());
        Ok(())
    }

    async fn cmd_close(&mut self, name: &str) -> Result<()> {
        let Some(page) = self.pages.remove(name) else {
            return Err(eyre::eyre!("No such page: {}", name));
        };
        let _ = page.shutdown().await;
        self.coordinator.unregister(name).await?;
        println!("{} Closed {}", "✓".green(), name.cyan());
        Ok(())
    }

    async fn cmd_get(&self) -> Result<()> {
        if let Some(page) = self.control_target().await
            && let Ok(speed) = page.get_speed().await
        {
            println!("Current speed: {}", speed.to_string().cyan());
            return Ok(());
        }

        // No usable target: fall back to the committed value.
        let committed = self.store.read()?.unwrap_or_default();
        println!("Current speed: {} {}", committed.to_string().cyan(), "(from store)".dimmed());
        println!("{}", "Speed control not supported here".dimmed());
        Ok(())
    }

    async fn cmd_set(&self, raw: Option<&str>) -> Result<()> {
        let raw = raw.ok_or_else(|| eyre::eyre!("Usage: set <value>"))?;

        // Free-text input: a non-number becomes a missing payload and the
        // page falls back to the default speed.
        let payload = raw.parse::<f64>().ok();
        if payload.is_none() {
            println!("{}", format!("\"{}\" is not a number, applying default", raw).dimmed());
        }

        let Some(page) = self.control_target().await else {
            println!("{}", "Speed control not supported here".dimmed());
            return Ok(());
        };

        match page.set_payload(payload).await {
            Ok(ack) => println!("{} Speed set to {}", "✓".green(), ack.value.to_string().cyan()),
            Err(_) => println!("{}", "Speed control not supported here".dimmed()),
        }
        Ok(())
    }

    async fn cmd_preset(&self, raw: Option<&str>) -> Result<()> {
        let raw = raw.ok_or_else(|| eyre::eyre!("Usage: preset <1-{}>", PRESET_SPEEDS.len()))?;
        let index: usize = raw.parse().map_err(|_| eyre::eyre!("Preset must be a number"))?;
        let preset = index
            .checked_sub(1)
            .and_then(|i| PRESET_SPEEDS.get(i))
            .ok_or_else(|| eyre::eyre!("Preset out of range (1-{})", PRESET_SPEEDS.len()))?;

        let Some(page) = self.control_target().await else {
            println!("{}", "Speed control not supported here".dimmed());
            return Ok(());
        };

        match page.set_payload(Some(*preset)).await {
            Ok(ack) => println!("{} Speed set to {}", "✓".green(), ack.value.to_string().cyan()),
            Err(_) => println!("{}", "Speed control not supported here".dimmed()),
        }
        Ok(())
    }

    /// Feed a raw wire message into the triad: requests go to the focused
    /// page and the reply is printed as it would appear on the wire;
    /// notices are relayed to the coordinator, as the host bus would.
    async fn cmd_raw(&self, json: &str) -> Result<()> {
        if json.is_empty() {
            return Err(eyre::eyre!("Usage: raw <json>"));
        }

        if let Some(PageNotice::SpeedUpdated { value }) = protocol::parse_notice(json) {
            let Some(page_id) = self.coordinator.status().await?.active_page else {
                println!("{}", "Notice dropped (no focused page to attribute it to)".dimmed());
                return Ok(());
            };
            // Fire-and-forget, like the page's own announcements.
            let _ = self
                .coordinator
                .notice_sink()
                .send(CoordCommand::SpeedUpdated { page_id, value })
                .await;
            println!("{} Notice relayed", "✓".green());
            return Ok(());
        }

        let Some(request) = protocol::parse_request(json) else {
            println!("{}", "Message ignored (unknown or malformed)".dimmed());
            return Ok(());
        };

        let Some(page) = self.control_target().await else {
            println!("{}", "Speed control not supported here".dimmed());
            return Ok(());
        };

        match request {
            PageRequest::GetSpeed => match page.get_speed().await {
                Ok(value) => println!("{}", serde_json::to_string(&SpeedReply { value })?),
                Err(_) => println!("{}", "Speed control not supported here".dimmed()),
            },
            PageRequest::SetSpeed { value } => match page.set_payload(value).await {
                Ok(ack) => println!("{}", serde_json::to_string(&ack)?),
                Err(_) => println!("{}", "Speed control not supported here".dimmed()),
            },
        }
        Ok(())
    }

    /// Resolve the page the control surface talks to: the focused page, if
    /// it is still open.
    async fn control_target(&self) -> Option<PageHandle> {
        let status = self.coordinator.status().await.ok()?;
        let active = status.active_page?;
        self.pages.get(&active).cloned()
    }

    fn page(&self, name: &str) -> Result<PageHandle> {
        self.pages
            .get(name)
            .cloned()
            .ok_or_else(|| eyre::eyre!("No such page: {}", name))
    }

    async fn print_status(&self) -> Result<()> {
        let status = self.coordinator.status().await?;
        let committed = self.store.read()?;

        println!();
        println!("{}", "Coordinator".bright_cyan());
        println!("  Active page: {}", status.active_page.as_deref().unwrap_or("(none)"));
        println!(
            "  Badge: {}",
            status.badge.map(|speed| speed.badge_text()).unwrap_or_else(|| "-".to_string())
        );
        println!(
            "  Pages: {}",
            if status.pages.is_empty() {
                "(none)".to_string()
            } else {
                status.pages.join(", ")
            }
        );
        println!(
            "  Pending round trips: {}",
            if status.pending.is_empty() {
                "(none)".to_string()
            } else {
                status.pending.join(", ")
            }
        );
        println!(
            "  Committed speed: {}",
            committed
                .map(|speed| speed.to_string())
                .unwrap_or_else(|| format!("{} (default, nothing committed)", SpeedValue::DEFAULT))
        );

        let metrics = &status.metrics;
        println!();
        println!("{}", "Metrics".bright_cyan());
        println!(
            "  Triggers: {} received, {} dropped pending, {} dropped no target",
            metrics.triggers_received, metrics.triggers_dropped_pending, metrics.triggers_dropped_no_target
        );
        println!(
            "  Round trips: {} applied, {} failed, {} timed out",
            metrics.round_trips_applied, metrics.round_trips_failed, metrics.round_trip_timeouts
        );
        println!("  Updates: {} received", metrics.updates_received);
        if metrics.commit_failures > 0 {
            println!("  Commit failures: {}", metrics.commit_failures);
        }
        println!();
        Ok(())
    }

    async fn print_pages(&self) {
        if self.pages.is_empty() {
            println!("{}", "No open pages.".dimmed());
            return;
        }

        println!();
        for (id, page) in &self.pages {
            match page.snapshot().await {
                Ok(snapshot) => {
                    println!("{}  speed {}", id.bright_cyan(), snapshot.desired_speed.to_string().cyan());
                    if snapshot.elements.is_empty() {
                        println!("  {}", "(no media)".dimmed());
                    }
                    for element in &snapshot.elements {
                        let state = if element.attached { "attached" } else { "detached" };
                        println!("  #{} {} rate {:.2} ({})", element.id, element.kind, element.playback_rate, state);
                    }
                }
                Err(_) => println!("{}  {}", id.bright_cyan(), "(unreachable)".dimmed()),
            }
        }
        println!();
    }

    async fn teardown(&mut self) {
        for page in self.pages.values() {
            let _ = page.shutdown().await;
        }
        let _ = self.coordinator.shutdown().await;
        let _ = (&mut self.coordinator_task).await;
    }
}

/// Result of a slash command
enum SlashResult {
    Continue,
    Quit,
}
