use std::io;
use std::io::Write;
use std::time::Duration;
use std::time::Instant;

use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEventKind;
use crossterm::execute;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::Backend;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Alignment;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::canvas::Canvas;
use ratatui::widgets::canvas::Points;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Clear;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use sweep_core::animation::AnimationPhase;
use sweep_core::animation::AnimationTarget;
use sweep_core::animation::Cue;
use sweep_core::animation::Particle;
use sweep_core::animation::EXPLOSION;
use sweep_core::visibility;
use sweep_core::Assignment;
use sweep_core::BoardState;
use sweep_core::ChannelStatus;
use sweep_core::FilterChip;
use sweep_core::LogLevel;
use sweep_core::Progress;
use sweep_core::RoomKey;
use sweep_core::TaskKey;
use sweep_core::UserAction;
use sweep_sync::ControllerHandle;
use sweep_sync::Presentation;
use tokio::sync::mpsc::UnboundedReceiver;

const FRAME: Duration = Duration::from_millis(50);
const CUE_BANNER: Duration = Duration::from_millis(1200);
const BAR_WIDTH: usize = 16;

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

pub fn run(
    handle: ControllerHandle,
    mut presentation: UnboundedReceiver<Presentation>,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let _guard = TuiGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    run_app(&mut terminal, &handle, &mut presentation).map_err(|e| e.into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Row {
    Room(RoomKey),
    Task(TaskKey),
}

impl Row {
    fn room(&self) -> RoomKey {
        match self {
            Row::Room(room) => room.clone(),
            Row::Task(task) => task.room_key(),
        }
    }
}

struct ActiveBurst {
    target: AnimationTarget,
    particles: Vec<Particle>,
    started: Instant,
}

#[derive(Default)]
struct UiState {
    selected: usize,
    confirm_reset: bool,
    shakes: Vec<(AnimationTarget, Instant)>,
    bursts: Vec<ActiveBurst>,
    cue: Option<(Cue, Instant)>,
    last_focus: Option<RoomKey>,
}

impl UiState {
    fn absorb(&mut self, presentation: Presentation, now: Instant) {
        match presentation {
            Presentation::Cue(cue) => {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(b"\x07");
                let _ = stdout.flush();
                self.cue = Some((cue, now));
            }
            Presentation::Shake { target, duration } => self.shakes.push((target, now + duration)),
            Presentation::Burst { target, particles } => self.bursts.push(ActiveBurst {
                target,
                particles,
                started: now,
            }),
        }
    }

    fn expire(&mut self, now: Instant) {
        self.shakes.retain(|(_, until)| *until > now);
        self.bursts
            .retain(|burst| now.duration_since(burst.started) < EXPLOSION);
        if matches!(self.cue, Some((_, at)) if now.duration_since(at) > CUE_BANNER) {
            self.cue = None;
        }
    }

    fn shaking(&self, target: &AnimationTarget) -> bool {
        self.shakes.iter().any(|(shaking, _)| shaking == target)
    }

    /// Jumps the selection to a room another session navigated to.
    fn follow_focus(&mut self, state: &BoardState, rows: &[Row]) {
        let focus = state.navigation.focused_room.clone();
        if focus == self.last_focus {
            return;
        }
        if let Some(room) = &focus {
            if let Some(index) = rows.iter().position(|row| row == &Row::Room(room.clone())) {
                self.selected = index;
            }
        }
        self.last_focus = focus;
    }
}

fn build_rows(state: &BoardState) -> Vec<Row> {
    let visible = visibility::displayed(state);
    let mut rows = Vec::new();
    for (room_key, room) in state.board.rooms() {
        if !visibility::floor_visible(&state.navigation.view, &room_key.floor)
            || !visible.room_visible(&room_key)
        {
            continue;
        }
        let tasks: Vec<TaskKey> = room
            .tasks
            .keys()
            .map(|name| room_key.task(name.as_str()))
            .filter(|key| visible.task_visible(key))
            .collect();
        rows.push(Row::Room(room_key));
        rows.extend(tasks.into_iter().map(Row::Task));
    }
    rows
}

enum KeyOutcome {
    Quit,
    Dispatch(UserAction),
    Nothing,
}

fn handle_key(code: KeyCode, ui: &mut UiState, rows: &[Row]) -> KeyOutcome {
    if ui.confirm_reset {
        ui.confirm_reset = false;
        return match code {
            KeyCode::Char('y') | KeyCode::Enter => KeyOutcome::Dispatch(UserAction::ResetTasks),
            _ => KeyOutcome::Nothing,
        };
    }

    let selected = rows.get(ui.selected);
    match code {
        KeyCode::Char('q') | KeyCode::Esc => KeyOutcome::Quit,
        KeyCode::Down | KeyCode::Char('j') => {
            if ui.selected + 1 < rows.len() {
                ui.selected += 1;
            }
            KeyOutcome::Nothing
        }
        KeyCode::Up | KeyCode::Char('k') => {
            ui.selected = ui.selected.saturating_sub(1);
            KeyOutcome::Nothing
        }
        KeyCode::Enter | KeyCode::Char(' ') => match selected {
            Some(Row::Task(key)) => KeyOutcome::Dispatch(UserAction::AdvanceProgress(key.clone())),
            Some(Row::Room(room)) => KeyOutcome::Dispatch(UserAction::NavigateToRoom(room.clone())),
            None => KeyOutcome::Nothing,
        },
        KeyCode::Char('a') => match selected {
            Some(Row::Task(key)) => KeyOutcome::Dispatch(UserAction::CycleAssignment(key.clone())),
            _ => KeyOutcome::Nothing,
        },
        KeyCode::Char(digit @ '0'..='6') => {
            let chip = digit
                .to_digit(10)
                .and_then(|index| Assignment::new(index as u8))
                .map(FilterChip::Assignment);
            match chip {
                Some(chip) => KeyOutcome::Dispatch(UserAction::ToggleFilter(chip)),
                None => KeyOutcome::Nothing,
            }
        }
        KeyCode::Char('f') => KeyOutcome::Dispatch(UserAction::ToggleFilter(FilterChip::All)),
        KeyCode::Char('c') => KeyOutcome::Dispatch(UserAction::ToggleShowCompleted),
        KeyCode::Char('h') => KeyOutcome::Dispatch(UserAction::ToggleShowHidden),
        KeyCode::Char('v') => KeyOutcome::Dispatch(UserAction::CycleView),
        KeyCode::Char('g') => KeyOutcome::Dispatch(UserAction::Refresh),
        KeyCode::Char('u') => KeyOutcome::Dispatch(UserAction::ResetHidden),
        KeyCode::Char('H') => match selected {
            Some(row) => KeyOutcome::Dispatch(UserAction::ToggleRoomHidden(row.room())),
            None => KeyOutcome::Nothing,
        },
        KeyCode::Char('r') => match selected {
            Some(row) => KeyOutcome::Dispatch(UserAction::ResetRoom(row.room())),
            None => KeyOutcome::Nothing,
        },
        KeyCode::Char('R') => {
            ui.confirm_reset = true;
            KeyOutcome::Nothing
        }
        _ => KeyOutcome::Nothing,
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    handle: &ControllerHandle,
    presentation: &mut UnboundedReceiver<Presentation>,
) -> io::Result<()> {
    let mut ui = UiState::default();
    loop {
        let now = Instant::now();
        while let Ok(next) = presentation.try_recv() {
            ui.absorb(next, now);
        }
        ui.expire(now);

        let state = handle.state();
        let rows = build_rows(&state);
        ui.follow_focus(&state, &rows);
        ui.selected = ui.selected.min(rows.len().saturating_sub(1));

        terminal.draw(|f| draw(f, &state, &rows, &ui, now))?;

        if !event::poll(FRAME)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match handle_key(key.code, &mut ui, &rows) {
            KeyOutcome::Quit => return Ok(()),
            KeyOutcome::Dispatch(action) => {
                if !handle.dispatch(action) {
                    return Ok(());
                }
            }
            KeyOutcome::Nothing => {}
        }
    }
}

#[derive(Clone, Copy)]
struct UiPalette {
    accent: Color,
    success: Color,
    warning: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
}

const PALETTE: UiPalette = UiPalette {
    accent: Color::Cyan,
    success: Color::Green,
    warning: Color::Yellow,
    danger: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    selected_bg: Color::DarkGray,
};

fn assignment_color(assignment: Assignment) -> Color {
    match assignment.index() {
        1 => Color::Magenta,
        2 => Color::Rgb(255, 165, 0),
        3 => Color::Red,
        4 => Color::Blue,
        5 => Color::Green,
        6 => Color::Cyan,
        _ => Color::Gray,
    }
}

fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Horizontal jitter for a shaking row, alternating every frame or so.
fn shake_offset(shaking: bool, now: Instant, origin: Instant) -> &'static str {
    if !shaking {
        return "";
    }
    if now.duration_since(origin).as_millis() / 60 % 2 == 0 {
        " "
    } else {
        ""
    }
}

fn draw(f: &mut ratatui::Frame, state: &BoardState, rows: &[Row], ui: &UiState, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(chunks[2]);

    render_header(f, chunks[0], state, ui);
    render_chips(f, chunks[1], state);
    render_board(f, body[0], state, rows, ui, now);
    render_bursts(f, body[0], ui, now);
    render_activity(f, body[1], state);
    render_action_bar(f, chunks[3]);

    if ui.confirm_reset {
        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);
        let prompt = Paragraph::new(Line::from(vec![
            Span::raw("Reset every task to 0% and unassigned?  "),
            Span::styled("y", Style::default().fg(PALETTE.danger)),
            Span::raw(" / "),
            Span::styled("n", Style::default().fg(PALETTE.accent)),
        ]))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PALETTE.danger))
                .title("Reset"),
        );
        f.render_widget(prompt, area);
    }
}

fn channel_style(status: ChannelStatus) -> Style {
    let color = match status {
        ChannelStatus::Open => PALETTE.success,
        ChannelStatus::Connecting => PALETTE.warning,
        ChannelStatus::Closed => PALETTE.danger,
    };
    Style::default().fg(color)
}

fn clock(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|ts| ts.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn render_header(f: &mut ratatui::Frame, area: Rect, state: &BoardState, ui: &UiState) {
    let synced = state
        .sync
        .last_reconciled_ms
        .map(clock)
        .unwrap_or_else(|| "never".to_string());
    let mut spans = vec![
        Span::styled(
            state.preferences.title().to_string(),
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  view ", Style::default().fg(PALETTE.muted)),
        Span::raw(state.navigation.view.label().to_string()),
        Span::styled("  channel ", Style::default().fg(PALETTE.muted)),
        Span::styled(state.sync.channel.label(), channel_style(state.sync.channel)),
        Span::styled("  pending ", Style::default().fg(PALETTE.muted)),
        Span::raw(state.sync.pending_writes.to_string()),
        Span::styled("  synced ", Style::default().fg(PALETTE.muted)),
        Span::raw(synced),
    ];
    if let Some((cue, _)) = ui.cue {
        spans.push(Span::styled(
            format!("  ♪ {}", cue.label()),
            Style::default().fg(PALETTE.warning),
        ));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_chips(f: &mut ratatui::Frame, area: Rect, state: &BoardState) {
    let prefs = &state.preferences;
    let mut spans = Vec::new();
    for chip in FilterChip::chips() {
        let color = match &chip {
            FilterChip::All => PALETTE.accent,
            FilterChip::Assignment(assignment) => assignment_color(*assignment),
        };
        let mut style = Style::default().fg(color);
        if prefs.active_filters.is_active(&chip) {
            style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
        }
        spans.push(Span::styled(format!(" {} ", prefs.chip_label(&chip)), style));
        spans.push(Span::raw(" "));
    }
    let flag = |on: bool| if on { "on" } else { "off" };
    spans.push(Span::styled(
        format!(
            "  completed {}  hidden {}",
            flag(prefs.show_completed),
            flag(prefs.show_hidden)
        ),
        Style::default().fg(PALETTE.muted),
    ));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border))
        .title("Filters");
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn phase_marker(phase: AnimationPhase) -> &'static str {
    match phase {
        AnimationPhase::Idle => " ",
        AnimationPhase::Shaking => "~",
        AnimationPhase::Exploding => "✸",
        AnimationPhase::Hidden => "✓",
    }
}

fn render_board(
    f: &mut ratatui::Frame,
    area: Rect,
    state: &BoardState,
    rows: &[Row],
    ui: &UiState,
    now: Instant,
) {
    let origin = ui
        .shakes
        .first()
        .map(|(_, until)| *until)
        .unwrap_or(now);
    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| match row {
            Row::Room(room_key) => {
                let Some(room) = state.board.room(room_key) else {
                    return ListItem::new(Line::raw(room_key.to_string()));
                };
                let target = AnimationTarget::Room(room_key.clone());
                let focused = state.navigation.focused_room.as_ref() == Some(room_key);
                let name_style = if focused {
                    Style::default()
                        .fg(PALETTE.accent)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                let mut spans = vec![
                    Span::raw(shake_offset(ui.shaking(&target), now, origin)),
                    Span::raw(phase_marker(room.animation.phase)),
                    Span::styled(
                        format!(" {} / {}", room_key.floor, room_key.room),
                        name_style,
                    ),
                    Span::styled(
                        format!("  {} {:>3.0}%", progress_bar(room.progress(), BAR_WIDTH / 2), room.progress()),
                        Style::default().fg(if room.is_complete() {
                            PALETTE.success
                        } else {
                            PALETTE.muted
                        }),
                    ),
                ];
                if room.hidden {
                    spans.push(Span::styled("  hidden", Style::default().fg(PALETTE.warning)));
                }
                ListItem::new(Line::from(spans))
            }
            Row::Task(key) => {
                let Some(task) = state.board.task(key) else {
                    return ListItem::new(Line::raw(key.to_string()));
                };
                let target = AnimationTarget::Task(key.clone());
                let color = assignment_color(task.assignment);
                let done = task.progress == Progress::COMPLETE;
                ListItem::new(Line::from(vec![
                    Span::raw("   "),
                    Span::raw(shake_offset(ui.shaking(&target), now, origin)),
                    Span::raw(phase_marker(task.animation.phase)),
                    Span::raw(format!(" {:<22}", key.task)),
                    Span::styled(
                        progress_bar(f64::from(task.progress.value()), BAR_WIDTH),
                        Style::default().fg(color),
                    ),
                    Span::styled(
                        format!(" {:>4}", task.progress.to_string()),
                        Style::default().fg(if done { PALETTE.success } else { Color::White }),
                    ),
                    Span::styled(
                        format!("  {}", state.preferences.assignment_label(task.assignment)),
                        Style::default().fg(color),
                    ),
                ]))
            }
        })
        .collect();

    let title = format!("Board ({} tasks shown)", rows.iter().filter(|row| matches!(row, Row::Task(_))).count());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PALETTE.border))
                .title(title),
        )
        .highlight_style(Style::default().bg(PALETTE.selected_bg));
    let mut list_state = ListState::default();
    if !rows.is_empty() {
        list_state.select(Some(ui.selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_bursts(f: &mut ratatui::Frame, area: Rect, ui: &UiState, now: Instant) {
    if ui.bursts.is_empty() {
        return;
    }
    let layers: Vec<(Color, Vec<(f64, f64)>)> = ui
        .bursts
        .iter()
        .map(|burst| {
            let t = now.duration_since(burst.started).as_secs_f64() / EXPLOSION.as_secs_f64();
            let t = t.clamp(0.0, 1.0);
            let coords = burst
                .particles
                .iter()
                .map(|particle| {
                    let (x, y) = particle.offset();
                    (f64::from(x) * t, f64::from(y) * t)
                })
                .collect();
            let color = match burst.target {
                AnimationTarget::Task(_) => PALETTE.warning,
                AnimationTarget::Room(_) => PALETTE.success,
            };
            (color, coords)
        })
        .collect();
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    let canvas = Canvas::default()
        .x_bounds([-200.0, 200.0])
        .y_bounds([-200.0, 200.0])
        .paint(|ctx| {
            for (color, coords) in &layers {
                ctx.draw(&Points {
                    coords,
                    color: *color,
                });
            }
        });
    f.render_widget(canvas, inner);
}

fn render_activity(f: &mut ratatui::Frame, area: Rect, state: &BoardState) {
    let capacity = usize::from(area.height.saturating_sub(2));
    let items: Vec<ListItem> = state
        .activity
        .iter()
        .rev()
        .take(capacity)
        .map(|entry| {
            let color = match entry.level {
                LogLevel::Info => PALETTE.muted,
                LogLevel::Warn => PALETTE.warning,
                LogLevel::Error => PALETTE.danger,
            };
            ListItem::new(Line::from(vec![
                Span::styled(clock(entry.ts_ms), Style::default().fg(PALETTE.muted)),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(PALETTE.border))
            .title("Activity"),
    );
    f.render_widget(list, area);
}

fn render_action_bar(f: &mut ratatui::Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(PALETTE.accent));
    let label = |l: &'static str| Span::styled(l, Style::default().fg(PALETTE.muted));
    let text = Line::from(vec![
        key("enter"),
        label(" advance "),
        key("a"),
        label(" assign "),
        key("0-6 f"),
        label(" filter "),
        key("c h"),
        label(" completed/hidden "),
        key("H"),
        label(" hide room "),
        key("r R u"),
        label(" reset "),
        key("v"),
        label(" view "),
        key("g"),
        label(" refresh "),
        Span::styled("q", Style::default().fg(PALETTE.warning)),
        label(" quit"),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border));
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(p, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
