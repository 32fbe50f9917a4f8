use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

use crate::evaluator::CellState;
use crate::game::Game;
use crate::runtime::Action;
use crate::selector::Mode;
use crate::session::Phase;
use crate::{MAX_GUESSES, WORD_LENGTH};

const TITLE: &str = "كلمه";
const HORIZONTAL_MARGIN: u16 = 2;

/// On-screen keyboard, read right to left like the standard Arabic layout.
pub const KEYBOARD_ROWS: [&str; 3] = ["ضصثقفغعهخحجد", "شسيبلاتنمكط", "ئءؤرأىةوزظذ"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Intro,
    Board,
    Stats,
}

/// Front-end state around one [`Game`].
pub struct App {
    pub game: Game,
    pub view: View,
    pub show_share: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(game: Game) -> Self {
        let view = if game.needs_intro() { View::Intro } else { View::Board };
        Self {
            game,
            view,
            show_share: false,
            should_quit: false,
        }
    }

    pub fn handle(&mut self, action: Action) {
        if action == Action::Quit {
            self.should_quit = true;
            return;
        }

        match self.view {
            View::Intro => {
                self.game.mark_intro_seen();
                self.view = View::Board;
            }
            View::Stats => match action {
                Action::Dismiss | Action::ToggleStats => self.view = View::Board,
                Action::Submit if self.game.next_round() => self.view = View::Board,
                _ => {}
            },
            View::Board => match action {
                Action::Letter(c) => self.game.type_letter(c),
                Action::Backspace => self.game.backspace(),
                Action::Submit => {
                    if self.game.is_over() {
                        self.show_share = false;
                        self.game.next_round();
                    } else {
                        self.game.begin_submit();
                    }
                }
                Action::ToggleMode => {
                    self.show_share = false;
                    self.game.toggle_mode();
                }
                Action::ToggleStats => self.view = View::Stats,
                Action::Share => self.show_share = self.game.is_over() && !self.show_share,
                Action::Dismiss if self.show_share => self.show_share = false,
                Action::Dismiss => self.should_quit = true,
                Action::Quit => {}
            },
        }
    }

    /// Periodic housekeeping: finish a queued check, expire feedback, and
    /// follow the calendar.
    pub fn on_tick(&mut self, now: DateTime<Local>) {
        let was_over = self.game.is_over();
        if self.game.is_validating() {
            self.game.resolve_pending(now);
        }
        if !was_over && self.game.is_over() {
            self.view = View::Stats;
        }
        self.game.tick(Instant::now());
        if self.game.refresh_day(now.date_naive()) {
            self.show_share = false;
        }
    }
}

fn cell_style(state: Option<CellState>) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match state {
        Some(CellState::Correct) => bold.fg(Color::White).bg(Color::Green),
        Some(CellState::Present) => bold.fg(Color::Black).bg(Color::Yellow),
        Some(CellState::Absent) => bold.fg(Color::White).bg(Color::DarkGray),
        None => bold,
    }
}

/// One grid row, first letter on the right.
fn grid_row(letters: &str, states: Option<&[CellState]>, invalid: bool) -> Line<'static> {
    let chars: Vec<char> = letters.chars().collect();
    let mut spans: Vec<Span> = (0..WORD_LENGTH)
        .map(|i| {
            let text = chars.get(i).map_or("·".to_string(), char::to_string);
            let mut style = cell_style(states.and_then(|s| s.get(i).copied()));
            if invalid {
                style = style.fg(Color::Red);
            }
            Span::styled(format!(" {text} "), style)
        })
        .collect();
    spans.reverse();
    let spaced: Vec<Span> = itertools::Itertools::intersperse(spans.into_iter(), Span::raw(" ")).collect();
    Line::from(spaced)
}

fn grid_lines(game: &Game) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = game
        .guesses()
        .iter()
        .zip(game.evaluations())
        .map(|(guess, evaluation)| grid_row(guess, Some(evaluation), false))
        .collect();
    if !game.is_over() && lines.len() < MAX_GUESSES {
        lines.push(grid_row(game.current_guess(), None, game.invalid_guess()));
    }
    while lines.len() < MAX_GUESSES {
        lines.push(grid_row("", None, false));
    }
    lines
}

fn keyboard_lines(game: &Game) -> Vec<Line<'static>> {
    KEYBOARD_ROWS
        .iter()
        .map(|row| {
            let mut spans: Vec<Span> = row
                .chars()
                .map(|c| Span::styled(format!(" {c} "), cell_style(game.key_state(c))))
                .collect();
            spans.reverse();
            Line::from(spans)
        })
        .collect()
}

fn status_line(game: &Game) -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let text = match game.feedback() {
        Some(feedback) => return Line::from(Span::styled(feedback.text(), Style::default().fg(Color::Yellow))),
        None => match game.phase() {
            Phase::Lost => format!("الكلمة كانت: {}", game.solution()),
            Phase::Won => "أحسنت! لقد فزت!".to_string(),
            _ => String::new(),
        },
    };
    Line::from(Span::styled(text, dim))
}

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Daily => "الوضع اليومي",
        Mode::Random => "كلمة عشوائية",
    }
}

fn legend(game: &Game) -> &'static str {
    if game.is_over() {
        "(enter) next / (tab) mode / (^s) stats / (^y) share / (esc)ape"
    } else {
        "(enter) check / (tab) mode / (^s) stats / (esc)ape"
    }
}

fn render_board(app: &App, area: Rect, buf: &mut Buffer) {
    let game = &app.game;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1),                 // title
            Constraint::Length(1),                 // mode
            Constraint::Length(1),                 // feedback
            Constraint::Length(MAX_GUESSES as u16), // grid
            Constraint::Length(1),
            Constraint::Length(KEYBOARD_ROWS.len() as u16),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(TITLE, bold))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);
    Paragraph::new(Span::styled(mode_label(game.mode()), italic))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    Paragraph::new(status_line(game))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    Paragraph::new(grid_lines(game))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    Paragraph::new(keyboard_lines(game))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    Paragraph::new(Span::styled(legend(game), italic)).render(chunks[7], buf);

    if app.show_share {
        if let Some(text) = game.share_text() {
            render_share(&text, area, buf);
        }
    }
}

fn render_share(text: &str, area: Rect, buf: &mut Buffer) {
    let width = text.lines().map(UnicodeWidthStr::width).max().unwrap_or(0) as u16 + 4;
    let height = text.lines().count() as u16 + 2;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    };
    Clear.render(popup, buf);
    Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("مشاركة النتيجة"))
        .render(popup, buf);
}

/// `label │████ count`, scaled so the longest bar fills `width`.
pub fn distribution_bar(label: &str, count: u32, max: u32, width: usize) -> String {
    let prefix = format!("{label} │");
    let room = width.saturating_sub(prefix.width() + count.to_string().width() + 1).max(1);
    let filled = if max == 0 {
        0
    } else {
        ((count as usize * room) as f64 / max as f64).round() as usize
    };
    format!("{prefix}{} {count}", "█".repeat(filled.max(1)))
}

fn render_stats(app: &App, area: Rect, buf: &mut Buffer) {
    let game = &app.game;
    let stats = game.stats();
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let block = Block::default().borders(Borders::ALL).title("الإحصائيات");
    let inner = block.inner(area);
    block.render(area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(MAX_GUESSES as u16),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let summary = vec![
        Line::from(Span::styled(
            format!(
                "{}   {}   {}   {}",
                stats.total_played,
                stats.win_percentage(),
                stats.current_streak,
                stats.max_streak
            ),
            bold,
        )),
        Line::from("لعبت   % فوز   السلسلة الحالية   أقصى سلسلة"),
    ];
    Paragraph::new(summary)
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(Span::styled("توزيع التخمينات", bold))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let max = stats.max_distribution();
    let width = chunks[2].width as usize;
    let highlight = game.is_won().then(|| game.guesses().len());
    let bars: Vec<Line> = stats
        .distribution
        .iter()
        .enumerate()
        .map(|(i, count)| {
            let text = distribution_bar(&(i + 1).to_string(), *count, max, width);
            if highlight == Some(i + 1) {
                Line::from(Span::styled(text, Style::default().fg(Color::Green)))
            } else {
                Line::from(text)
            }
        })
        .collect();
    Paragraph::new(bars).render(chunks[2], buf);

    let outcome = match game.phase() {
        Phase::Won => "🎉 أحسنت! 🎉".to_string(),
        Phase::Lost => format!("الكلمة كانت: {}", game.solution()),
        _ => String::new(),
    };
    Paragraph::new(outcome)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    let hint = if game.mode() == Mode::Random && game.is_over() {
        "(enter) لعبة جديدة / (esc) back"
    } else {
        "(esc) back"
    };
    Paragraph::new(Span::styled(hint, Style::default().add_modifier(Modifier::ITALIC)))
        .render(chunks[5], buf);
}

fn render_intro(area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(Span::styled("مرحباً بك في كلمه!", bold)),
        Line::from(""),
        Line::from("خمن الكلمة المكونة من ٥ أحرف في ٦ محاولات أو أقل."),
        Line::from("كل تخمين يجب أن يكون كلمة عربية صحيحة من ٥ أحرف."),
        Line::from("بعد كل تخمين، ستتغير ألوان المربعات لإظهار مدى قرب تخمينك من الكلمة الصحيحة."),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ك ", cell_style(Some(CellState::Correct))),
            Span::raw(" في المكان الصحيح  "),
            Span::styled(" ت ", cell_style(Some(CellState::Present))),
            Span::raw(" في مكان خاطئ  "),
            Span::styled(" ة ", cell_style(Some(CellState::Absent))),
            Span::raw(" غير موجود"),
        ]),
        Line::from(""),
        Line::from("هناك كلمة جديدة كل يوم!"),
        Line::from(""),
        Line::from(Span::styled(
            "press any key",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("كيفية اللعب"))
        .render(area, buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.view {
            View::Intro => render_intro(area, buf),
            View::Board => render_board(self, area, buf),
            View::Stats => render_stats(self, area, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameOptions;
    use crate::storage::MemoryStore;
    use crate::words::WordList;
    use chrono::NaiveDate;

    fn create_test_app() -> App {
        let date = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let game = Game::new(Box::new(MemoryStore::new()), GameOptions::default(), date, Local::now());
        App::new(game)
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn type_word(app: &mut App, word: &str) {
        for c in word.chars() {
            app.handle(Action::Letter(c));
        }
    }

    #[test]
    fn first_run_shows_intro_once() {
        let mut app = create_test_app();
        assert_eq!(app.view, View::Intro);
        assert!(rendered(&app, Rect::new(0, 0, 100, 20)).contains("كلمه"));

        app.handle(Action::Letter('م'));
        assert_eq!(app.view, View::Board);
        assert_eq!(app.game.current_guess(), "");
        assert!(!app.game.needs_intro());
    }

    #[test]
    fn board_renders_title_and_mode() {
        let mut app = create_test_app();
        app.view = View::Board;
        let text = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(text.contains(TITLE));
        assert!(text.contains(mode_label(Mode::Daily)));
    }

    #[test]
    fn submit_resolves_on_tick() {
        let mut app = create_test_app();
        app.view = View::Board;
        let solution = app.game.solution().to_string();
        type_word(&mut app, &solution);
        app.handle(Action::Submit);
        assert!(app.game.is_validating());

        app.on_tick(Local::now());
        assert!(app.game.is_won());
        assert_eq!(app.view, View::Stats);
        assert!(rendered(&app, Rect::new(0, 0, 80, 24)).contains("أحسنت"));

        app.handle(Action::Dismiss);
        assert_eq!(app.view, View::Board);
    }

    #[test]
    fn share_only_when_over() {
        let mut app = create_test_app();
        app.view = View::Board;
        app.handle(Action::Share);
        assert!(!app.show_share);

        let solution = app.game.solution().to_string();
        type_word(&mut app, &solution);
        app.handle(Action::Submit);
        app.on_tick(Local::now());
        app.handle(Action::Dismiss);
        app.handle(Action::Share);
        assert!(app.show_share);
        assert!(rendered(&app, Rect::new(0, 0, 80, 24)).contains("1/6"));

        app.handle(Action::Dismiss);
        assert!(!app.show_share);
        assert!(!app.should_quit);
    }

    #[test]
    fn lost_game_reveals_solution() {
        let mut app = create_test_app();
        app.view = View::Board;
        let solution = app.game.solution().to_string();
        let wrong = WordList::valid().words.into_iter().find(|w| *w != solution).unwrap();
        for _ in 0..MAX_GUESSES {
            type_word(&mut app, &wrong);
            app.handle(Action::Submit);
            app.on_tick(Local::now());
        }
        assert_eq!(app.game.phase(), Phase::Lost);
        assert!(rendered(&app, Rect::new(0, 0, 80, 24)).contains(&solution));
    }

    #[test]
    fn escape_quits_from_board() {
        let mut app = create_test_app();
        app.view = View::Board;
        app.handle(Action::Dismiss);
        assert!(app.should_quit);
    }

    #[test]
    fn small_area_does_not_panic() {
        let mut app = create_test_app();
        for view in [View::Intro, View::Board, View::Stats] {
            app.view = view;
            let area = Rect::new(0, 0, 20, 5);
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert_eq!(*buffer.area(), area);
        }
    }

    #[test]
    fn grid_row_is_right_to_left() {
        let line = grid_row("مدرسة", None, false);
        let cells: Vec<String> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(cells.first().map(String::as_str), Some(" ة "));
        assert_eq!(cells.last().map(String::as_str), Some(" م "));
    }

    #[test]
    fn keyboard_has_no_duplicate_keys() {
        let mut keys: Vec<char> = KEYBOARD_ROWS.iter().flat_map(|r| r.chars()).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn keyboard_covers_every_listed_letter() {
        let keys: String = KEYBOARD_ROWS.concat();
        for list in [WordList::daily(), WordList::valid(), WordList::dictionary()] {
            for word in &list.words {
                for letter in word.chars() {
                    assert!(keys.contains(letter), "{letter} from {word} has no key");
                }
            }
        }
    }

    #[test]
    fn bars_scale_to_width() {
        assert_eq!(distribution_bar("1", 0, 1, 20), "1 │█ 0");
        let full = distribution_bar("2", 4, 4, 20);
        assert_eq!(full.width(), 20);
        let half = distribution_bar("3", 2, 4, 20);
        assert!(half.width() < full.width());
    }
}
