use std::{cmp, io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use crewbook_core::{
    crew::{Severity, Warning},
    store::{CrewRepository, SectionFlags},
    Card, CatalogStore, CrewSession, FactionSummary, FileStore, KvCrewRepository, LoadError,
    LoadedFaction, SavedCrew, SessionError, Slot,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use serde_json::Value;
use tokio::{spawn, sync::mpsc};
use tracing::{error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_NAME_LEN: usize = 64;
const BUDGET_STEP: i32 = 5;

const DETAILS_SECTION: &str = "card-details";
const WARNINGS_SECTION: &str = "warnings";

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;
const SELECTION_BG: Color = Color::DarkGray;
const SUCCESS: Color = Color::Green;
const WARNING: Color = Color::Yellow;
const DANGER: Color = Color::Red;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Factions,
    Builder,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Cards,
    Crew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    SaveName { as_new: bool },
    Budget,
}

/// Single-line text input shown as a modal. `cursor` counts chars, not bytes.
#[derive(Debug, Clone)]
struct TextPrompt {
    kind: PromptKind,
    input: String,
    cursor: usize,
    default: String,
}

impl TextPrompt {
    fn new(kind: PromptKind, default: String) -> Self {
        Self {
            kind,
            cursor: default.chars().count(),
            input: default.clone(),
            default,
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map(|(offset, _)| offset)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = (self.cursor as isize + delta).clamp(0, self.len() as isize);
        self.cursor = next as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= MAX_NAME_LEN {
            return;
        }
        let accepted = match self.kind {
            PromptKind::Budget => ch.is_ascii_digit(),
            PromptKind::SaveName { .. } => !ch.is_control(),
        };
        if accepted {
            let offset = self.byte_offset(self.cursor);
            self.input.insert(offset, ch);
            self.cursor += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.len() {
            self.cursor -= 1;
            let offset = self.byte_offset(self.cursor);
            self.input.remove(offset);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let offset = self.byte_offset(self.cursor);
            self.input.remove(offset);
        }
    }

    fn value(&self) -> String {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            self.default.clone()
        } else {
            trimmed.to_string()
        }
    }
}

/// Cursor and scroll offset for a list of `len` rows shown `height` at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ListCursor {
    cursor: usize,
    offset: usize,
}

impl ListCursor {
    fn move_by(&mut self, delta: isize, len: usize, height: usize) {
        if len == 0 {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = idx as usize;
        self.ensure_visible(len, height);
    }

    fn move_to(&mut self, index: usize, len: usize, height: usize) {
        if len == 0 {
            return;
        }
        self.cursor = index.min(len - 1);
        self.ensure_visible(len, height);
    }

    fn clamp(&mut self, len: usize, height: usize) {
        if len == 0 {
            *self = Self::default();
            return;
        }
        if self.cursor >= len {
            self.cursor = len - 1;
        }
        self.ensure_visible(len, height);
    }

    fn ensure_visible(&mut self, len: usize, height: usize) {
        if len == 0 || height == 0 {
            self.offset = 0;
            return;
        }
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
        self.offset = self.offset.min(len.saturating_sub(height));
    }

    fn window(&self, len: usize, height: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(len);
        start..(start + height).min(len)
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    IndexLoaded(Result<Vec<FactionSummary>, LoadError>),
    FactionLoaded(Result<LoadedFaction, LoadError>),
}

/// Terminal crew builder driving a [`CrewSession`].
pub struct CrewbookApp {
    catalog: CatalogStore,
    repository: KvCrewRepository<FileStore>,
    session: CrewSession,
    sections: SectionFlags,
    factions: Vec<FactionSummary>,
    saved: Vec<SavedCrew>,
    screen: Screen,
    focus: Focus,
    mode: Mode,
    filter: String,
    faction_list: ListCursor,
    card_list: ListCursor,
    crew_list: ListCursor,
    saved_list: ListCursor,
    list_height: usize,
    prompt: Option<TextPrompt>,
    pending_loads: usize,
    pending_restore: Option<SavedCrew>,
    status: String,
    should_quit: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl CrewbookApp {
    pub fn new(
        catalog: CatalogStore,
        repository: KvCrewRepository<FileStore>,
        default_budget: u32,
    ) -> Self {
        let sections = SectionFlags::load(repository.store());
        Self {
            catalog,
            repository,
            session: CrewSession::new(default_budget),
            sections,
            factions: Vec::new(),
            saved: Vec::new(),
            screen: Screen::Factions,
            focus: Focus::Cards,
            mode: Mode::Browse,
            filter: String::new(),
            faction_list: ListCursor::default(),
            card_list: ListCursor::default(),
            crew_list: ListCursor::default(),
            saved_list: ListCursor::default(),
            list_height: 1,
            prompt: None,
            pending_loads: 0,
            pending_restore: None,
            status: "Ready".to_string(),
            should_quit: false,
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.refresh_saved();

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.start_index_load();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                let result = if self.prompt.is_some() {
                    self.handle_prompt_key(key)
                } else {
                    self.handle_key(key)
                };
                if let Err(err) = result {
                    self.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                if self.mode == Mode::Filter {
                    self.set_status(format!("Filter: {}", self.filter));
                }
                true
            }
            Some(AppEvent::IndexLoaded(result)) => {
                match result {
                    Ok(factions) => {
                        self.factions = factions;
                        self.faction_list
                            .clamp(self.factions.len(), self.list_height);
                        self.set_status(format!("Loaded {} factions", self.factions.len()));
                    }
                    Err(err) => {
                        error!(?err, "Catalog index load failed");
                        self.set_status(format!("Failed to load catalog: {err} (r to retry)"));
                    }
                }
                true
            }
            Some(AppEvent::FactionLoaded(result)) => {
                self.pending_loads = self.pending_loads.saturating_sub(1);
                match result {
                    Ok(loaded) => self.install_faction(loaded),
                    Err(err) => {
                        error!(?err, "Faction load failed");
                        self.set_status(format!("Failed to load faction: {err}"));
                    }
                }
                true
            }
            None => false,
        }
    }

    fn sender(&mut self) -> Option<mpsc::Sender<AppEvent>> {
        let sender = self.event_tx.clone();
        if sender.is_none() {
            error!("event_channel_missing");
            self.set_status("Internal error: event channel unavailable");
        }
        sender
    }

    fn start_index_load(&mut self) {
        let Some(sender) = self.sender() else {
            return;
        };
        self.set_status("Loading catalog…");
        let catalog = self.catalog.clone();
        spawn(async move {
            let result = catalog.load_index().await;
            let _ = sender.send(AppEvent::IndexLoaded(result)).await;
        });
    }

    fn start_faction_load(&mut self, faction: FactionSummary) {
        let Some(sender) = self.sender() else {
            return;
        };
        self.pending_loads += 1;
        info!(faction = %faction.id, "Loading faction");
        self.set_status(format!("Loading {}…", faction.display_name));
        let catalog = self.catalog.clone();
        spawn(async move {
            let result = catalog.load_faction(&faction.id).await;
            let _ = sender.send(AppEvent::FactionLoaded(result)).await;
        });
    }

    fn install_faction(&mut self, loaded: LoadedFaction) {
        let id = loaded.summary.id.clone();
        let name = loaded.summary.display_name.clone();
        let cards = loaded.faction.cards.len();
        let findings = loaded.findings.len();

        self.session.install_faction(loaded);
        self.filter.clear();
        self.mode = Mode::Browse;
        self.card_list = ListCursor::default();
        self.crew_list = ListCursor::default();
        self.focus = Focus::Cards;
        if self.screen == Screen::Factions || self.pending_restore.is_some() {
            self.screen = Screen::Builder;
        }

        let restore = self
            .pending_restore
            .as_ref()
            .is_some_and(|saved| saved.faction == id);
        if restore {
            if let Some(saved) = self.pending_restore.take() {
                self.restore_saved(&saved);
            }
            return;
        }

        let mut status = format!("Loaded {name}: {cards} cards");
        if findings > 0 {
            status.push_str(&format!(" ({findings} data issues logged)"));
        }
        self.set_status(status);
    }

    fn restore_saved(&mut self, saved: &SavedCrew) {
        match self.session.restore_saved(saved) {
            Ok(rejected) if rejected.is_empty() => {
                self.set_status(format!("Loaded crew '{}'", saved.name));
            }
            Ok(rejected) => {
                let skipped: Vec<&str> = rejected.iter().map(|r| r.card()).collect();
                self.set_status(format!(
                    "Loaded crew '{}'; skipped {}",
                    saved.name,
                    skipped.join(", ")
                ));
            }
            Err(err) => self.set_status(format!("Could not load crew: {err}")),
        }
        self.crew_list = ListCursor::default();
        self.screen = Screen::Builder;
    }

    fn refresh_saved(&mut self) {
        self.saved = self.repository.list_saved();
        self.saved_list.clamp(self.saved.len(), self.list_height);
    }

    fn visible_cards(&self) -> Vec<Arc<Card>> {
        self.session
            .faction()
            .map(|loaded| {
                loaded
                    .faction
                    .cards_matching(&self.filter)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn crew_rows(&self) -> Vec<(Slot, Arc<Card>)> {
        let roster = self.session.crew().roster();
        Slot::ORDER
            .iter()
            .flat_map(|&slot| {
                roster
                    .section(slot)
                    .iter()
                    .map(move |card| (slot, Arc::clone(card)))
            })
            .collect()
    }

    fn selected_card(&self) -> Option<Arc<Card>> {
        match self.focus {
            Focus::Cards => self.visible_cards().get(self.card_list.cursor).cloned(),
            Focus::Crew => self
                .crew_rows()
                .get(self.crew_list.cursor)
                .map(|(_, card)| Arc::clone(card)),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.screen {
            Screen::Factions => self.handle_factions_key(key),
            Screen::Builder => match self.mode {
                Mode::Filter => self.handle_filter_key(key),
                Mode::Browse => self.handle_builder_key(key),
            },
            Screen::Saved => self.handle_saved_key(key),
        }
    }

    fn handle_factions_key(&mut self, key: KeyEvent) -> Result<()> {
        let len = self.factions.len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                self.faction_list.move_by(1, len, self.list_height)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.faction_list.move_by(-1, len, self.list_height)
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.faction_list.move_to(0, len, self.list_height)
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.faction_list
                    .move_to(len.saturating_sub(1), len, self.list_height)
            }
            KeyCode::Char('r') => self.start_index_load(),
            KeyCode::Char('l') => self.open_saved(),
            KeyCode::Esc if self.session.faction().is_some() => self.screen = Screen::Builder,
            KeyCode::Enter => {
                let Some(faction) = self.factions.get(self.faction_list.cursor).cloned() else {
                    self.set_status("No faction selected");
                    return Ok(());
                };
                self.pending_restore = None;
                self.start_faction_load(faction);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.filter.clear();
                self.card_list = ListCursor::default();
                self.set_status("Filter cleared");
            }
            KeyCode::Enter => {
                self.mode = Mode::Browse;
                self.set_status(format!("Filter applied: {}", self.filter));
            }
            KeyCode::Backspace => {
                self.filter.pop();
                self.card_list = ListCursor::default();
            }
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.filter.push(c);
                    self.card_list = ListCursor::default();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_builder_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.screen = Screen::Factions,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Cards => Focus::Crew,
                    Focus::Crew => Focus::Cards,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_focused(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_focused(-1),
            KeyCode::Enter | KeyCode::Char('a') => self.add_selected()?,
            KeyCode::Char('x') => self.remove_selected(false),
            KeyCode::Char('X') => self.remove_selected(true),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_budget(BUDGET_STEP),
            KeyCode::Char('-') => self.adjust_budget(-BUDGET_STEP),
            KeyCode::Char('b') => {
                let current = self.session.crew().budget().to_string();
                self.prompt = Some(TextPrompt::new(PromptKind::Budget, current));
            }
            KeyCode::Char('s') => self.open_save_prompt(false),
            KeyCode::Char('S') => self.open_save_prompt(true),
            KeyCode::Char('n') => {
                self.session.new_crew();
                self.crew_list = ListCursor::default();
                self.set_status("Started a new crew");
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Filter;
                self.focus = Focus::Cards;
                self.set_status("Enter filter text");
            }
            KeyCode::Char('c') => self.toggle_section(DETAILS_SECTION),
            KeyCode::Char('w') => self.toggle_section(WARNINGS_SECTION),
            KeyCode::Char('l') => self.open_saved(),
            KeyCode::Char('f') => self.screen = Screen::Factions,
            _ => {}
        }
        Ok(())
    }

    fn handle_saved_key(&mut self, key: KeyEvent) -> Result<()> {
        let len = self.saved.len();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('h') => {
                self.screen = if self.session.faction().is_some() {
                    Screen::Builder
                } else {
                    Screen::Factions
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.saved_list.move_by(1, len, self.list_height),
            KeyCode::Char('k') | KeyCode::Up => self.saved_list.move_by(-1, len, self.list_height),
            KeyCode::Enter => {
                let Some(saved) = self.saved.get(self.saved_list.cursor).cloned() else {
                    return Ok(());
                };
                self.load_saved(saved);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let Some(saved) = self.saved.get(self.saved_list.cursor).cloned() else {
                    return Ok(());
                };
                self.session.delete_saved(&self.repository, &saved.id)?;
                self.refresh_saved();
                self.set_status(format!("Deleted '{}'", saved.name));
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.set_status("Cancelled");
            }
            KeyCode::Enter => {
                let kind = prompt.kind;
                let value = prompt.value();
                self.prompt = None;
                self.submit_prompt(kind, &value)?;
            }
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    prompt.insert(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn submit_prompt(&mut self, kind: PromptKind, value: &str) -> Result<()> {
        match kind {
            PromptKind::Budget => match value.parse::<u32>() {
                Ok(budget) => {
                    self.session.set_budget(budget);
                    self.set_status(format!("Budget set to {budget} ducats"));
                }
                Err(_) => self.set_status("Budget must be a whole number of ducats"),
            },
            PromptKind::SaveName { as_new } => {
                let saved = if as_new {
                    self.session.save_as_new(&self.repository, value)?
                } else {
                    self.session.save(&self.repository, value)?
                };
                self.refresh_saved();
                let validity = if saved.valid { "valid" } else { "has warnings" };
                self.set_status(format!("Saved '{}' ({validity})", saved.name));
            }
        }
        Ok(())
    }

    fn move_focused(&mut self, delta: isize) {
        match self.focus {
            Focus::Cards => {
                let len = self.visible_cards().len();
                self.card_list.move_by(delta, len, self.list_height);
            }
            Focus::Crew => {
                let len = self.crew_rows().len();
                self.crew_list.move_by(delta, len, self.list_height);
            }
        }
    }

    fn add_selected(&mut self) -> Result<()> {
        let Some(card) = self.selected_card() else {
            self.set_status("No card selected");
            return Ok(());
        };
        match self.session.add_card(&card.name) {
            Ok(slot) => self.set_status(format!("Added {} to {}", card.name, slot.title())),
            Err(SessionError::Rejected(rejected)) => self.set_status(rejected.to_string()),
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    fn remove_selected(&mut self, all: bool) {
        let Some(card) = self.selected_card() else {
            self.set_status("No card selected");
            return;
        };
        let removed = if all {
            self.session.remove_all(&card.name)
        } else {
            usize::from(self.session.remove_one(&card.name))
        };
        if removed == 0 {
            self.set_status(format!("{} is not in the crew", card.name));
        } else {
            self.set_status(format!("Removed {removed} × {}", card.name));
        }
        let len = self.crew_rows().len();
        self.crew_list.clamp(len, self.list_height);
    }

    fn adjust_budget(&mut self, delta: i32) {
        let budget = self.session.crew().budget().saturating_add_signed(delta);
        self.session.set_budget(budget);
        self.set_status(format!("Budget set to {budget} ducats"));
    }

    fn open_save_prompt(&mut self, as_new: bool) {
        let Some(loaded) = self.session.faction() else {
            self.set_status("Select a faction first");
            return;
        };
        let bound_name = if as_new {
            None
        } else {
            self.session
                .crew()
                .saved_id()
                .and_then(|id| self.saved.iter().find(|saved| saved.id == id))
                .map(|saved| saved.name.clone())
        };
        let default = bound_name.unwrap_or_else(|| {
            format!(
                "{} {}",
                loaded.summary.display_name,
                Local::now().format("%Y-%m-%d")
            )
        });
        self.prompt = Some(TextPrompt::new(PromptKind::SaveName { as_new }, default));
    }

    fn open_saved(&mut self) {
        self.refresh_saved();
        self.screen = Screen::Saved;
        if self.saved.is_empty() {
            self.set_status("No saved crews");
        } else {
            self.set_status("Select a crew to load");
        }
    }

    fn load_saved(&mut self, saved: SavedCrew) {
        let installed = self
            .session
            .faction()
            .is_some_and(|loaded| loaded.summary.id == saved.faction);
        if installed {
            self.restore_saved(&saved);
            return;
        }
        let faction = self
            .factions
            .iter()
            .find(|faction| faction.id == saved.faction)
            .cloned()
            .unwrap_or_else(|| saved.faction_ref());
        self.pending_restore = Some(saved);
        self.start_faction_load(faction);
    }

    fn toggle_section(&mut self, section: &str) {
        let collapsed = self.sections.toggle(section);
        if let Err(err) = self.sections.persist(self.repository.store()) {
            warn!(?err, "Failed to persist panel state");
            self.set_status(format!("Failed to remember panel state: {err}"));
            return;
        }
        let state = if collapsed { "collapsed" } else { "expanded" };
        self.set_status(format!("{} panel {state}", section_title(section)));
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Factions => self.draw_factions(frame),
            Screen::Builder => self.draw_builder(frame),
            Screen::Saved => self.draw_saved(frame),
        }
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn split_status(area: Rect) -> (Rect, Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(4)])
            .split(area);
        (chunks[0], chunks[1])
    }

    fn draw_factions(&mut self, frame: &mut Frame) {
        let (body, status) = Self::split_status(frame.size());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(body);

        self.list_height = columns[0].height.saturating_sub(2) as usize;
        let len = self.factions.len();
        self.faction_list.clamp(len, self.list_height);
        let items: Vec<ListItem> = self.factions[self.faction_list.window(len, self.list_height)]
            .iter()
            .enumerate()
            .map(|(idx, faction)| {
                let selected = self.faction_list.offset + idx == self.faction_list.cursor;
                let mut spans = vec![
                    marker(selected),
                    Span::styled(
                        faction.display_name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ];
                if let Some(count) = faction.card_count {
                    spans.push(Span::styled(
                        format!(" · {count} cards"),
                        Style::default().fg(MUTED),
                    ));
                }
                highlight(ListItem::new(Line::from(spans)), selected)
            })
            .collect();
        let title = if self.pending_loads > 0 {
            "Factions (loading…)"
        } else {
            "Factions"
        };
        frame.render_widget(
            List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
            columns[0],
        );

        let block = Block::default().borders(Borders::ALL).title("Faction");
        let lines = match self.factions.get(self.faction_list.cursor) {
            Some(faction) => {
                let mut lines = vec![Line::from(Span::styled(
                    faction.display_name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ))];
                lines.push(Line::from(Span::styled(
                    faction.id.clone(),
                    Style::default().fg(MUTED),
                )));
                if let Some(ability) = &faction.faction_ability {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(
                        ability.name.clone(),
                        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                    )));
                    if !ability.description.is_empty() {
                        lines.push(Line::from(ability.description.clone()));
                    }
                }
                lines
            }
            None => vec![Line::from("No factions available")],
        };
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            columns[1],
        );

        self.render_status(frame, status, "Enter load  l saved crews  r reload  q quit");
    }

    fn draw_builder(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(area);
        self.render_builder_header(frame, rows[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        self.render_card_list(frame, columns[0]);

        let report = self.session.report();
        let warnings_height = if self.sections.is_collapsed(WARNINGS_SECTION) {
            3
        } else {
            (report.warnings.len().max(1) as u16 + 2).min(8)
        };
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),
                Constraint::Length(warnings_height),
                if self.sections.is_collapsed(DETAILS_SECTION) {
                    Constraint::Length(3)
                } else {
                    Constraint::Percentage(45)
                },
            ])
            .split(columns[1]);
        self.render_crew(frame, right[0]);
        self.render_warnings(frame, right[1], &report.warnings);
        self.render_details(frame, right[2]);

        self.render_status(
            frame,
            rows[2],
            "a add  x/X remove  +/- b budget  s save  S save as  n new  / filter  c/w panels  l saved  Tab focus",
        );
    }

    fn render_builder_header(&self, frame: &mut Frame, area: Rect) {
        let report = self.session.report();
        let faction = self
            .session
            .faction()
            .map(|loaded| loaded.summary.display_name.clone())
            .unwrap_or_else(|| "No faction".to_string());
        let remaining_style = if report.remaining < 0 {
            Style::default().fg(DANGER)
        } else {
            Style::default().fg(SUCCESS)
        };
        let bound = self
            .session
            .crew()
            .saved_id()
            .and_then(|id| self.saved.iter().find(|saved| saved.id == id))
            .map(|saved| format!("  ·  '{}'", saved.name))
            .unwrap_or_default();
        let line = Line::from(vec![
            Span::styled(faction, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "  ·  {} / {} ducats  ·  ",
                report.total_cost, report.budget
            )),
            Span::styled(format!("{} remaining", report.remaining), remaining_style),
            Span::styled(bound, Style::default().fg(MUTED)),
        ]);
        frame.render_widget(
            Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Crew")),
            area,
        );
    }

    fn render_card_list(&mut self, frame: &mut Frame, area: Rect) {
        self.list_height = area.height.saturating_sub(2) as usize;
        let cards = self.visible_cards();
        self.card_list.clamp(cards.len(), self.list_height);
        let crew = self.session.crew();

        let items: Vec<ListItem> = cards[self.card_list.window(cards.len(), self.list_height)]
            .iter()
            .enumerate()
            .map(|(idx, card)| {
                let selected = self.focus == Focus::Cards
                    && self.card_list.offset + idx == self.card_list.cursor;
                let name_style = if crew.can_add(card) {
                    Style::default()
                } else {
                    Style::default().fg(MUTED)
                };
                let mut spans = vec![
                    marker(selected),
                    Span::styled(card.name.clone(), name_style),
                    Span::styled(
                        format!("  {} · {}d", card.rank_text(), card.ducats),
                        Style::default().fg(MUTED),
                    ),
                ];
                let count = crew.count_of(&card.name);
                if count > 0 {
                    spans.push(Span::styled(format!("  ×{count}"), Style::default().fg(ACCENT)));
                }
                highlight(ListItem::new(Line::from(spans)), selected)
            })
            .collect();

        let title = if self.filter.is_empty() {
            format!("Cards ({})", cards.len())
        } else {
            format!("Cards ({}) · /{}", cards.len(), self.filter)
        };
        frame.render_widget(
            List::new(items).block(focus_block(title, self.focus == Focus::Cards)),
            area,
        );
    }

    fn render_crew(&mut self, frame: &mut Frame, area: Rect) {
        let rows = self.crew_rows();
        self.crew_list.clamp(rows.len(), self.list_height);
        let roster = self.session.crew().roster();

        let mut lines = Vec::new();
        let mut selected_line = 0;
        let mut index = 0;
        for slot in Slot::ORDER {
            let section = roster.section(slot);
            let cost: u32 = section.iter().map(|card| card.ducats).sum();
            lines.push(Line::from(Span::styled(
                format!("{} ({}) · {}d", slot.title(), section.len(), cost),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for card in section {
                let selected = self.focus == Focus::Crew && index == self.crew_list.cursor;
                if selected {
                    selected_line = lines.len();
                }
                let mut line = Line::from(vec![
                    marker(selected),
                    Span::raw(card.name.clone()),
                    Span::styled(format!("  {}d", card.ducats), Style::default().fg(MUTED)),
                ]);
                if selected {
                    line.style = Style::default().bg(SELECTION_BG);
                }
                lines.push(line);
                index += 1;
            }
        }

        let height = area.height.saturating_sub(2) as usize;
        let scroll = selected_line.saturating_sub(height.saturating_sub(1));
        frame.render_widget(
            Paragraph::new(lines)
                .block(focus_block(
                    format!("Roster ({})", rows.len()),
                    self.focus == Focus::Crew,
                ))
                .scroll((scroll as u16, 0)),
            area,
        );
    }

    fn render_warnings(&self, frame: &mut Frame, area: Rect, warnings: &[Warning]) {
        let block = Block::default().borders(Borders::ALL).title("Warnings");
        let lines = if self.sections.is_collapsed(WARNINGS_SECTION) {
            vec![Line::from(Span::styled(
                format!("{} hidden (w to expand)", warnings.len()),
                Style::default().fg(MUTED),
            ))]
        } else if warnings.is_empty() {
            vec![Line::from(Span::styled(
                "Crew is valid",
                Style::default().fg(SUCCESS),
            ))]
        } else {
            warnings
                .iter()
                .map(|warning| {
                    let color = match warning.severity {
                        Severity::Violation => DANGER,
                        Severity::Advisory => WARNING,
                    };
                    Line::from(Span::styled(
                        format!("• {warning}"),
                        Style::default().fg(color),
                    ))
                })
                .collect()
        };
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Card");
        if self.sections.is_collapsed(DETAILS_SECTION) {
            frame.render_widget(
                Paragraph::new(Span::styled("Hidden (c to expand)", Style::default().fg(MUTED)))
                    .block(block),
                area,
            );
            return;
        }
        let Some(card) = self.selected_card() else {
            frame.render_widget(Paragraph::new("No card selected").block(block), area);
            return;
        };
        frame.render_widget(
            Paragraph::new(card_lines(&card))
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
    }

    fn draw_saved(&mut self, frame: &mut Frame) {
        let (body, status) = Self::split_status(frame.size());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(body);

        self.list_height = columns[0].height.saturating_sub(2) as usize;
        let len = self.saved.len();
        self.saved_list.clamp(len, self.list_height);
        let items: Vec<ListItem> = self.saved[self.saved_list.window(len, self.list_height)]
            .iter()
            .enumerate()
            .map(|(idx, saved)| {
                let selected = self.saved_list.offset + idx == self.saved_list.cursor;
                let validity = if saved.valid {
                    Span::styled("  ✓", Style::default().fg(SUCCESS))
                } else {
                    Span::styled("  !", Style::default().fg(WARNING))
                };
                let line = Line::from(vec![
                    marker(selected),
                    Span::styled(saved.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!(" · {}", saved.faction_name),
                        Style::default().fg(MUTED),
                    ),
                    validity,
                ]);
                highlight(ListItem::new(line), selected)
            })
            .collect();
        frame.render_widget(
            List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Saved crews ({len})")),
            ),
            columns[0],
        );

        let block = Block::default().borders(Borders::ALL).title("Details");
        let lines = match self.saved.get(self.saved_list.cursor) {
            Some(saved) => saved_lines(saved),
            None => vec![Line::from("No saved crews")],
        };
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            columns[1],
        );

        self.render_status(frame, status, "Enter load  d delete  Esc back  q quit");
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, help: &str) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.mode == Mode::Filter && self.screen == Screen::Builder {
            format!("Filter: {}", self.filter)
        } else {
            self.status.clone()
        };
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            Line::from(Span::styled(help.to_string(), Style::default().fg(MUTED))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &TextPrompt) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5_u16);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let (title, instruction) = match prompt.kind {
            PromptKind::SaveName { as_new: false } => ("Save crew", "Crew name"),
            PromptKind::SaveName { as_new: true } => ("Save as new crew", "Crew name"),
            PromptKind::Budget => ("Budget", "Ducat limit"),
        };
        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::raw(prompt.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);

        let paragraph = Paragraph::new(vec![
            Line::from(instruction),
            input_line,
            Line::from(""),
            helper,
            Line::from(format!("Default: {}", prompt.default)),
        ])
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }
}

fn card_lines(card: &Card) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(card.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {} · {} ducats", card.rank_text(), card.ducats),
            Style::default().fg(MUTED),
        ),
    ])];
    if !card.keywords.is_empty() {
        lines.push(Line::from(Span::styled(
            card.keywords.join(", "),
            Style::default().fg(ACCENT),
        )));
    }

    let counters: Vec<String> = [
        ("Actions", card.actions),
        ("Life", card.life),
        ("Will", card.will),
        ("Command", card.command),
    ]
    .iter()
    .filter_map(|(label, value)| value.map(|value| format!("{label} {value}")))
    .collect();
    if !counters.is_empty() {
        lines.push(Line::from(counters.join("  ")));
    }
    if let Some(stats) = &card.stat_block {
        lines.push(Line::from(format!(
            "MOV {}  DEX {}  ATK {}  PRO {}  MND {}",
            value_text(stats.movement.as_ref()),
            value_text(stats.dexterity.as_ref()),
            value_text(stats.attack.as_ref()),
            value_text(stats.protection.as_ref()),
            value_text(stats.mind.as_ref()),
        )));
    }
    if let Some(base) = &card.base_size {
        lines.push(Line::from(format!("Base {}", value_text(Some(base)))));
    }

    for weapon in &card.weapons {
        lines.push(Line::from(format!(
            "⚔ {}  R {}  E {}  D {}  P {}",
            weapon.name,
            value_text(Some(&weapon.range)),
            value_text(Some(&weapon.evasion)),
            value_text(Some(&weapon.damage)),
            value_text(Some(&weapon.penetration)),
        )));
    }

    let common: Vec<&str> = card.abilities.common.iter().map(|a| a.name()).collect();
    if !common.is_empty() {
        lines.push(Line::from(format!("Abilities: {}", common.join(", "))));
    }
    for ability in &card.abilities.unique {
        lines.push(Line::from(vec![
            Span::styled(ability.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(": {}", ability.description)),
        ]));
    }
    for ability in &card.abilities.command {
        let kind = ability
            .kind
            .as_deref()
            .map(|kind| format!(" [{kind}]"))
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}{kind}", ability.name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(": {}", ability.description)),
        ]));
    }
    lines
}

fn saved_lines(saved: &SavedCrew) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            saved.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Faction: {}", saved.faction_name)),
        Line::from(format!(
            "Cost: {} / {} ducats",
            saved.total_cost, saved.budget
        )),
        Line::from(format!(
            "Saved: {}",
            saved
                .saved_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        )),
        Line::from(""),
    ];
    let sections = [
        (Slot::Leaders, &saved.crew.leaders),
        (Slot::Heroes, &saved.crew.heroes),
        (Slot::Henchmen, &saved.crew.henchmen),
    ];
    for (slot, cards) in sections {
        if cards.is_empty() {
            continue;
        }
        let names: Vec<&str> = cards.iter().map(|card| card.name.as_str()).collect();
        lines.push(Line::from(format!("{}: {}", slot.title(), names.join(", "))));
    }
    lines
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn section_title(section: &str) -> &'static str {
    match section {
        DETAILS_SECTION => "Card details",
        WARNINGS_SECTION => "Warnings",
        _ => "Panel",
    }
}

fn marker(selected: bool) -> Span<'static> {
    if selected {
        Span::styled(
            "▶ ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw("  ")
    }
}

fn highlight(item: ListItem<'_>, selected: bool) -> ListItem<'_> {
    if selected {
        item.style(Style::default().bg(SELECTION_BG))
    } else {
        item
    }
}

fn focus_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_cursor_scrolls_to_keep_selection_visible() {
        let mut list = ListCursor::default();
        list.move_by(5, 10, 3);
        assert_eq!(list, ListCursor { cursor: 5, offset: 3 });
        list.move_by(-5, 10, 3);
        assert_eq!(list, ListCursor { cursor: 0, offset: 0 });
        list.move_to(99, 10, 3);
        assert_eq!(list.cursor, 9);
        assert_eq!(list.window(10, 3), 7..10);

        list.clamp(4, 3);
        assert_eq!(list, ListCursor { cursor: 3, offset: 1 });
        list.clamp(0, 3);
        assert_eq!(list, ListCursor::default());
    }

    #[test]
    fn budget_prompt_accepts_digits_only() {
        let mut prompt = TextPrompt::new(PromptKind::Budget, "150".to_string());
        prompt.insert('x');
        prompt.backspace();
        prompt.insert('5');
        assert_eq!(prompt.value(), "155");

        prompt.move_home();
        prompt.delete();
        prompt.delete();
        prompt.delete();
        assert_eq!(prompt.value(), "150");
    }

    #[test]
    fn name_prompt_edits_at_cursor() {
        let mut prompt = TextPrompt::new(PromptKind::SaveName { as_new: false }, "Guild".into());
        prompt.move_home();
        prompt.insert('X');
        prompt.move_end();
        prompt.move_cursor(-2);
        prompt.backspace();
        assert_eq!(prompt.value(), "XGuld");
    }

    #[test]
    fn name_prompt_steps_over_multibyte_chars() {
        let mut prompt =
            TextPrompt::new(PromptKind::SaveName { as_new: false }, "Crew Société".into());
        assert_eq!(prompt.cursor, 12);
        prompt.backspace();
        assert_eq!(prompt.value(), "Crew Sociét");
        prompt.backspace();
        assert_eq!(prompt.value(), "Crew Socié");

        prompt.move_cursor(-1);
        prompt.delete();
        assert_eq!(prompt.value(), "Crew Soci");
        prompt.insert('è');
        prompt.insert('t');
        prompt.move_end();
        prompt.insert('ü');
        assert_eq!(prompt.value(), "Crew Sociètü");
        assert_eq!(prompt.cursor, 12);
    }

    #[test]
    fn values_render_without_json_quotes() {
        assert_eq!(value_text(Some(&Value::String("30mm".into()))), "30mm");
        assert_eq!(value_text(Some(&serde_json::json!(4))), "4");
        assert_eq!(value_text(None), "-");
    }
}
