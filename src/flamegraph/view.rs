use super::events::{FlameEvents, back_target};
use super::layout::{self, Direction, FrameLayout, RenderedFrame};
use super::tree::{FrameId, FrameTree};
use crossterm::event::KeyCode;
use log::debug;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use std::time::{Duration, Instant};

/// Two clicks on the same frame closer than this count as a double click
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(500);

/// Interactive flame graph over one frame tree.
///
/// The layout is scratch state rebuilt on every draw; navigation and
/// hit-testing read whatever the last draw produced.
pub struct FlameGraphView {
    tree: FrameTree,
    direction: Direction,
    source_page: String,
    surface: Rect,
    layout: FrameLayout,
    focus: Option<FrameId>,
    last_click: Option<(FrameId, Instant)>,
}

impl FlameGraphView {
    pub fn new(direction: Direction, source_page: impl Into<String>) -> Self {
        FlameGraphView {
            tree: FrameTree::new(),
            direction,
            source_page: source_page.into(),
            surface: Rect::default(),
            layout: FrameLayout::default(),
            focus: None,
            last_click: None,
        }
    }

    /// Swap in a freshly built tree and focus its first frame
    pub fn replace_tree(&mut self, tree: FrameTree) {
        self.focus = tree.root().children.first().copied();
        self.tree = tree;
        self.layout = FrameLayout::default();
        self.last_click = None;
        debug!(
            "Flame graph now holds {} frames, max depth {}",
            self.tree.len(),
            self.tree.max_depth()
        );
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn source_page(&self) -> &str {
        &self.source_page
    }

    pub fn set_source_page(&mut self, source_page: impl Into<String>) {
        self.source_page = source_page.into();
    }

    /// Drawing surface for the next layout pass
    pub fn set_surface(&mut self, area: Rect) {
        self.surface = area;
    }

    pub fn surface(&self) -> Rect {
        self.surface
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn focused(&self) -> Option<FrameId> {
        self.focus
    }

    pub fn focused_record(&self) -> Option<&RenderedFrame> {
        self.focus.and_then(|id| self.layout.record_of(id))
    }

    /// Focus `frame` if the last layout pass rendered it
    pub fn focus_frame(&mut self, frame: FrameId) -> bool {
        if self.layout.record_of(frame).is_some() {
            self.focus = Some(frame);
            true
        } else {
            false
        }
    }

    /// Rebuild the layout for the current surface
    pub fn relayout(&mut self) {
        let area = self.surface;
        if area.width == 0 || area.height == 0 {
            self.layout = FrameLayout::default();
            return;
        }
        let origin_row = match self.direction {
            Direction::TopDown => i32::from(area.y),
            Direction::BottomUp => i32::from(area.bottom()) - 1,
        };
        self.layout = layout::layout(
            &self.tree,
            u32::from(area.x),
            u32::from(area.width),
            origin_row,
            self.direction,
        );
    }

    /// Frame painted at a screen cell. Later records paint over earlier
    /// ones, so the last match wins. Cells outside the surface hold nothing,
    /// even where an overflowing or too-deep record would reach.
    pub fn frame_at(&self, column: u16, row: u16) -> Option<&RenderedFrame> {
        let area = self.surface;
        if column < area.x || column >= area.right() || row < area.y || row >= area.bottom() {
            return None;
        }
        let (column, row) = (u32::from(column), i32::from(row));
        self.layout
            .frames()
            .iter()
            .rev()
            .find(|r| r.contains(column, row))
    }

    pub fn move_right(&mut self) {
        let Some(current) = self.focused_record().copied() else {
            return;
        };
        let next = self.layout.frames()[current.index + 1..]
            .iter()
            .find(|r| r.y == current.y);
        if let Some(next) = next {
            self.focus = Some(next.frame);
        }
    }

    pub fn move_left(&mut self) {
        let Some(current) = self.focused_record().copied() else {
            return;
        };
        let prev = self.layout.frames()[..current.index]
            .iter()
            .rev()
            .find(|r| r.y == current.y);
        if let Some(prev) = prev {
            self.focus = Some(prev.frame);
        }
    }

    /// Focus the parent frame; top-level frames stay put
    pub fn move_up(&mut self) {
        let Some(current) = self.focused_record() else {
            return;
        };
        let parent = self.tree.frame(current.frame).parent;
        if let Some(parent) = parent.and_then(|p| self.layout.record_of(p)) {
            self.focus = Some(parent.frame);
        }
    }

    /// Focus a frame on the next depth row that overlaps the current span.
    ///
    /// Real children win over frames that only overlap because a neighbour
    /// overflowed; among equals the leftmost, then earliest rendered, wins.
    pub fn move_down(&mut self) {
        let Some(current) = self.focused_record().copied() else {
            return;
        };
        let row = current.y + self.direction.child_step();
        let target = self
            .layout
            .frames()
            .iter()
            .filter(|r| r.y == row && r.overlaps(&current))
            .min_by_key(|r| {
                let own_child = self.tree.frame(r.frame).parent == Some(current.frame);
                (!own_child, r.x, r.index)
            });
        if let Some(target) = target {
            self.focus = Some(target.frame);
        }
    }

    /// Report the focused frame to the host
    pub fn activate(&self, events: &mut dyn FlameEvents) {
        if let Some(record) = self.focused_record() {
            self.select(record.frame, events);
        }
    }

    /// Ask the host to go back to wherever this view was opened from
    pub fn back(&self, events: &mut dyn FlameEvents) {
        events.on_switch_page(back_target(&self.source_page));
    }

    fn select(&self, frame: FrameId, events: &mut dyn FlameEvents) {
        let stack = self.tree.stack_of(frame);
        events.on_select(&stack, self.tree.frame(frame).count);
    }

    /// Handle a key press; returns false if the key means nothing here
    pub fn handle_key(&mut self, key: KeyCode, events: &mut dyn FlameEvents) -> bool {
        if key == KeyCode::Esc {
            self.back(events);
            return true;
        }
        if self.layout.is_empty() {
            return false;
        }
        match key {
            KeyCode::Left | KeyCode::Char('h') => self.move_left(),
            KeyCode::Right | KeyCode::Char('l') => self.move_right(),
            KeyCode::Up | KeyCode::Char('k') => self.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_down(),
            KeyCode::Enter => self.activate(events),
            _ => return false,
        }
        true
    }

    pub fn handle_click(&mut self, column: u16, row: u16, events: &mut dyn FlameEvents) {
        self.click_at(column, row, Instant::now(), events);
    }

    /// Click handling with an explicit timestamp.
    ///
    /// Focuses the clicked frame; a second click on the same frame within
    /// [`DOUBLE_CLICK_WINDOW`] also selects it.
    pub fn click_at(
        &mut self,
        column: u16,
        row: u16,
        now: Instant,
        events: &mut dyn FlameEvents,
    ) {
        let Some(frame) = self.frame_at(column, row).map(|r| r.frame) else {
            self.last_click = None;
            return;
        };
        self.focus = Some(frame);

        let double = matches!(
            self.last_click,
            Some((prev, at)) if prev == frame
                && now.saturating_duration_since(at) <= DOUBLE_CLICK_WINDOW
        );
        if double {
            self.last_click = None;
            self.select(frame, events);
        } else {
            self.last_click = Some((frame, now));
        }
    }

    /// Name, count and share of the total for the focused frame
    pub fn focused_summary(&self) -> Option<(&str, u64, f64)> {
        let frame = self.tree.get(self.focus?)?;
        let total = self.tree.root().count;
        let pct = if total == 0 {
            0.0
        } else {
            frame.count as f64 * 100.0 / total as f64
        };
        Some((frame.name.as_str(), frame.count, pct))
    }

    /// Lay out for `area` and paint into `buf`
    pub fn draw(&mut self, area: Rect, buf: &mut Buffer) {
        self.surface = area;
        self.relayout();
        if self.tree.is_empty() {
            return;
        }

        for record in self.layout.frames() {
            let Some(cells) = visible_cells(record, area) else {
                continue;
            };
            let style = if Some(record.frame) == self.focus {
                Style::default()
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().bg(record.color).fg(Color::Black)
            };
            buf.set_style(cells, style);
            let name = &self.tree.frame(record.frame).name;
            buf.set_stringn(cells.x, cells.y, name, usize::from(cells.width), style);
        }
    }
}

impl Widget for &mut FlameGraphView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.draw(area, buf);
    }
}

/// Part of a record that falls inside `area`, as a one-row rect
fn visible_cells(record: &RenderedFrame, area: Rect) -> Option<Rect> {
    let top = i32::from(area.y);
    let bottom = i32::from(area.bottom());
    if record.y < top || record.y >= bottom {
        return None;
    }
    let left = record.x.max(u32::from(area.x));
    let right = record.right().min(u32::from(area.right()));
    if left >= right {
        return None;
    }
    // All values are inside `area`, so they fit in u16
    Some(Rect::new(
        left as u16,
        record.y as u16,
        (right - left) as u16,
        1,
    ))
}
