use crate::error::Result;
use crate::flamegraph::events::{PAGE_EXIT, PAGE_FLAMEGRAPH, PAGE_QUERIES, PAGE_STACK_DETAIL};
use crate::flamegraph::{Direction, EventLog, FlameGraphView, FrameTree, TreeLoader, TreeUpdate};
use crate::storage::{QuerySummary, StackSource, query_summaries};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info, warn};
use ratatui::{Terminal, prelude::*};
use std::io::{self, stdout};
use std::time::{Duration, Instant};

use super::ui;

/// Source page reported by flame graphs opened straight from the command line
pub const PAGE_COMMAND_LINE: &str = "command-line";

/// Pages the host can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Queries,
    FlameGraph,
    StackDetail,
}

impl Page {
    pub fn id(self) -> &'static str {
        match self {
            Page::Queries => PAGE_QUERIES,
            Page::FlameGraph => PAGE_FLAMEGRAPH,
            Page::StackDetail => PAGE_STACK_DETAIL,
        }
    }

    pub fn from_id(id: &str) -> Option<Page> {
        match id {
            PAGE_QUERIES => Some(Page::Queries),
            PAGE_FLAMEGRAPH => Some(Page::FlameGraph),
            PAGE_STACK_DETAIL => Some(Page::StackDetail),
            _ => None,
        }
    }
}

pub struct App {
    source: StackSource,
    page: Page,
    running: bool,

    // Queries page
    queries: Vec<QuerySummary>,
    selected_row: usize,
    scroll_offset: usize,
    table_area: Rect,

    // Flame graphs
    query_id: Option<String>,
    flame: FlameGraphView,
    detail: FlameGraphView,
    detail_stack: Option<(Vec<String>, u64)>,

    loader: TreeLoader,
    status: Option<String>,
    refresh: Option<Duration>,
    last_load: Instant,
}

impl App {
    fn with_source(source: StackSource, page: Page, direction: Direction) -> Self {
        let flame_source = if source.is_database() {
            PAGE_QUERIES
        } else {
            PAGE_COMMAND_LINE
        };
        App {
            source,
            page,
            running: true,
            queries: Vec::new(),
            selected_row: 0,
            scroll_offset: 0,
            table_area: Rect::default(),
            query_id: None,
            flame: FlameGraphView::new(direction, flame_source),
            detail: FlameGraphView::new(direction, PAGE_STACK_DETAIL),
            detail_stack: None,
            loader: TreeLoader::new(),
            status: None,
            refresh: None,
            last_load: Instant::now(),
        }
    }

    /// Browse a profile database, starting on the queries page unless
    /// `query_id` picks a flame graph directly
    pub fn for_database(
        source: StackSource,
        query_id: Option<String>,
        direction: Direction,
        refresh: Option<Duration>,
    ) -> Result<Self> {
        let mut app = App::with_source(source, Page::Queries, direction);
        app.refresh = refresh;
        app.reload_queries()?;
        match query_id {
            Some(id) => app.open_query(id),
            None if app.queries.is_empty() => app.status = Some("No stacks recorded".to_string()),
            None => {}
        }
        Ok(app)
    }

    /// Show one folded stacks file
    pub fn for_folded(source: StackSource, direction: Direction) -> Result<Self> {
        let mut app = App::with_source(source, Page::FlameGraph, direction);
        app.request_load();
        Ok(app)
    }

    fn reload_queries(&mut self) -> Result<()> {
        if let Some(conn) = self.source.connect()? {
            self.queries = query_summaries(&conn)?;
            self.selected_row = self
                .selected_row
                .min(self.queries.len().saturating_sub(1));
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Main loop
        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        while self.running {
            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key(key.code);
                        }
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => {
                            self.handle_click(mouse.column, mouse.row);
                        }
                        MouseEventKind::ScrollUp if self.page == Page::Queries => {
                            self.scroll_by(-3);
                        }
                        MouseEventKind::ScrollDown if self.page == Page::Queries => {
                            self.scroll_by(3);
                        }
                        _ => {}
                    },
                    // The next draw lays out against the new size
                    Event::Resize(..) => {}
                    _ => {}
                }
            }

            if let Some(update) = self.loader.poll() {
                self.receive_tree(update);
            }

            if let Some(interval) = self.refresh
                && self.page != Page::Queries
                && !self.loader.is_loading()
                && self.last_load.elapsed() >= interval
            {
                self.request_load();
            }

            terminal.draw(|frame| {
                ui::render(frame, self);
            })?;
        }

        Ok(())
    }

    /// Start loading the current query's tree off the render thread
    pub fn request_load(&mut self) {
        let source = self.source.clone();
        let query_id = self.query_id.clone();
        self.last_load = Instant::now();
        if let Err(e) = self
            .loader
            .request(move || source.load(query_id.as_deref()))
        {
            self.status = Some(e.to_string());
        }
    }

    /// Swap in a finished load. Failed loads keep the tree on screen.
    fn receive_tree(&mut self, update: TreeUpdate) {
        match update.result {
            Ok(tree) => {
                info!(
                    "Load #{} finished: {} frames, {} samples",
                    update.generation,
                    tree.len(),
                    tree.root().count
                );
                self.status = if tree.is_empty() {
                    Some("No stacks".to_string())
                } else {
                    None
                };
                self.flame.replace_tree(tree);
            }
            Err(e) => {
                warn!("Load #{} failed: {}", update.generation, e);
                self.status = Some(format!("Load failed: {e}"));
            }
        }
    }

    fn open_query(&mut self, query_id: String) {
        debug!("Opening flame graph for {}", query_id);
        self.query_id = Some(query_id);
        self.flame.set_source_page(PAGE_QUERIES);
        self.flame.replace_tree(FrameTree::new());
        self.page = Page::FlameGraph;
        self.request_load();
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        if key == KeyCode::Char('q') {
            self.running = false;
            return;
        }

        match self.page {
            Page::Queries => self.handle_queries_key(key),
            Page::FlameGraph => {
                if key == KeyCode::Char('r') {
                    self.request_load();
                    return;
                }
                let mut events = EventLog::default();
                self.flame.handle_key(key, &mut events);
                self.apply_events(Page::FlameGraph, events);
            }
            Page::StackDetail => {
                let mut events = EventLog::default();
                self.detail.handle_key(key, &mut events);
                self.apply_events(Page::StackDetail, events);
            }
        }
    }

    fn handle_queries_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.running = false,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') | KeyCode::Home => {
                self.selected_row = 0;
                self.ensure_selection_visible();
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.selected_row = self.queries.len().saturating_sub(1);
                self.ensure_selection_visible();
            }
            KeyCode::Char('r') => {
                if let Err(e) = self.reload_queries() {
                    self.status = Some(e.to_string());
                }
            }
            KeyCode::Enter => {
                if let Some(summary) = self.queries.get(self.selected_row) {
                    let id = summary.query_id.clone();
                    self.open_query(id);
                }
            }
            _ => {}
        }
    }

    fn handle_click(&mut self, x: u16, y: u16) {
        match self.page {
            Page::Queries => {
                let area = self.table_area;
                if x >= area.x && x < area.right() && y >= area.y && y < area.bottom() {
                    // Table has: border (1) + header (1) = 2 rows before data
                    let click_row = y.saturating_sub(area.y).saturating_sub(2);
                    let clicked_index = self.scroll_offset + click_row as usize;
                    if clicked_index < self.queries.len() {
                        self.selected_row = clicked_index;
                    }
                }
            }
            Page::FlameGraph => {
                let mut events = EventLog::default();
                self.flame.handle_click(x, y, &mut events);
                self.apply_events(Page::FlameGraph, events);
            }
            Page::StackDetail => {
                let mut events = EventLog::default();
                self.detail.handle_click(x, y, &mut events);
                self.apply_events(Page::StackDetail, events);
            }
        }
    }

    /// React to what a flame graph on `origin` reported
    fn apply_events(&mut self, origin: Page, events: EventLog) {
        for (stack, count) in events.selections {
            self.open_stack_detail(origin, stack, count);
        }
        for target in events.page_switches {
            self.switch_page(&target);
        }
    }

    fn open_stack_detail(&mut self, origin: Page, stack: Vec<String>, count: u64) {
        let (tree, full_stack) = match origin {
            Page::StackDetail => {
                // The detail tree starts at the last label of the current stack
                let Some(id) = self.detail.tree().find(&stack) else {
                    return;
                };
                let mut full = self
                    .detail_stack
                    .as_ref()
                    .map(|(s, _)| s[..s.len().saturating_sub(1)].to_vec())
                    .unwrap_or_default();
                full.extend(stack);
                (self.detail.tree().subtree(id), full)
            }
            _ => {
                let Some(id) = self.flame.tree().find(&stack) else {
                    return;
                };
                (self.flame.tree().subtree(id), stack)
            }
        };
        debug!("Stack detail for {} ({} samples)", full_stack.join(";"), count);
        self.detail.replace_tree(tree);
        self.detail_stack = Some((full_stack, count));
        self.page = Page::StackDetail;
    }

    fn switch_page(&mut self, target: &str) {
        debug!("Switching to page {}", target);
        if target == PAGE_EXIT {
            self.running = false;
            return;
        }
        match Page::from_id(target) {
            Some(Page::Queries) if !self.source.is_database() => self.running = false,
            Some(page) => self.page = page,
            None => warn!("Unknown page {}", target),
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let new_row = if delta >= 0 {
            self.selected_row.saturating_add(delta as usize)
        } else {
            self.selected_row.saturating_sub((-delta) as usize)
        };
        self.selected_row = new_row.min(self.queries.len().saturating_sub(1));
        self.ensure_selection_visible();
    }

    fn visible_rows(&self) -> usize {
        // border (2) + header (1)
        self.table_area.height.saturating_sub(3) as usize
    }

    /// Scroll the queries table, never past its last full page
    fn scroll_by(&mut self, delta: isize) {
        let max_scroll = self.queries.len().saturating_sub(self.visible_rows().max(1));
        self.scroll_offset = self
            .scroll_offset
            .saturating_add_signed(delta)
            .min(max_scroll);
    }

    fn ensure_selection_visible(&mut self) {
        let visible_height = self.visible_rows();
        if visible_height == 0 {
            return;
        }

        if self.selected_row < self.scroll_offset {
            self.scroll_offset = self.selected_row;
        } else if self.selected_row >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_row - visible_height + 1;
        }
    }

    // Getters for UI
    pub fn page(&self) -> Page {
        self.page
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn source(&self) -> &StackSource {
        &self.source
    }

    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    pub fn queries(&self) -> &[QuerySummary] {
        &self.queries
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn set_table_area(&mut self, area: Rect) {
        self.table_area = area;
    }

    pub fn flame(&self) -> &FlameGraphView {
        &self.flame
    }

    pub fn flame_mut(&mut self) -> &mut FlameGraphView {
        &mut self.flame
    }

    pub fn detail(&self) -> &FlameGraphView {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut FlameGraphView {
        &mut self.detail
    }

    pub fn detail_stack(&self) -> Option<&(Vec<String>, u64)> {
        self.detail_stack.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn refresh(&self) -> Option<Duration> {
        self.refresh
    }

    /// Block until the pending load lands
    pub fn wait_for_load(&mut self, timeout: Duration) -> bool {
        match self.loader.wait(timeout) {
            Some(update) => {
                self.receive_tree(update);
                true
            }
            None => false,
        }
    }
}
