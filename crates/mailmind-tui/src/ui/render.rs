use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use mailmind_core::views::{CallbackState, CallbackView, LoginView};

use crate::app::{App, AppState, Dashboard, Screen};

use super::styles;

/// Lines of backend status shown on the dashboard.
const MAX_STATUS_LINES: usize = 12;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    match app.screen {
        Screen::Login(ref view) => render_login(frame, app, view, chunks[1]),
        Screen::Callback(ref view) => render_callback(frame, view, chunks[1]),
        Screen::Dashboard(ref dashboard) => render_dashboard(frame, dashboard, chunks[1]),
    }
    render_status_bar(frame, app, chunks[2]);

    if let Screen::Login(ref view) = app.screen {
        if let Some(alert) = view.alert() {
            render_alert_overlay(frame, alert);
        }
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Email Manager IA";
    let path = app.current_path();
    let padding = (area.width as usize).saturating_sub(title.len() + path.len() + 2);

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(path, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_login(frame: &mut Frame, app: &App, _view: &LoginView, area: Rect) {
    let height = if app.awaiting_redirect { 15 } else { 12 };
    let dialog = centered_rect_fixed(62, height, area);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Email Manager IA", styles::title_style())),
        Line::from(Span::styled(
            "Connect your Outlook account to get started",
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("["),
            Span::styled(" ▶ Connect with Microsoft Outlook ◀ ", styles::button_style()),
            Span::raw("]"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "By connecting your account you allow Email Manager IA to read",
            styles::muted_style(),
        )),
        Line::from(Span::styled(
            "and analyze your mail to organize it by urgency.",
            styles::muted_style(),
        )),
    ];

    if app.awaiting_redirect {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Paste the URL your browser was sent back to:",
            styles::text_style(),
        )));
        let visible = tail(&app.redirect_input, 54);
        lines.push(Line::from(vec![
            Span::styled("> ", styles::muted_style()),
            Span::styled(format!("{}▌", visible), styles::input_style()),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, dialog);
}

fn render_callback(frame: &mut Frame, view: &CallbackView, area: Rect) {
    let dialog = centered_rect_fixed(62, 9, area);
    let state = view.state();

    let (headline_style, detail, detail_style) = match state {
        CallbackState::Processing => (
            styles::title_style(),
            "Connecting to your Microsoft account...",
            styles::muted_style(),
        ),
        CallbackState::Success => (
            styles::success_style(),
            "Taking you to the dashboard...",
            styles::muted_style(),
        ),
        CallbackState::Error(_) => (
            styles::error_style(),
            "[Enter] Try again",
            styles::help_key_style(),
        ),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(state.message().to_string(), headline_style)),
        Line::from(""),
        Line::from(Span::styled(detail, detail_style)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(!matches!(state, CallbackState::Error(_))));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, dialog);
}

fn render_dashboard(frame: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(4)])
        .split(area);

    let profile_lines = match dashboard.profile {
        Some(ref profile) => vec![
            field_line("Name", &profile.name),
            field_line("Email", &profile.email),
            field_line("ID", &profile.id),
        ],
        None => vec![Line::from(Span::styled("No profile stored", styles::muted_style()))],
    };
    let profile_block = Block::default()
        .title(" Account ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(profile_lines).block(profile_block), chunks[0]);

    let status_lines: Vec<Line> = match (&dashboard.status, &dashboard.status_error) {
        (_, Some(error)) => vec![Line::from(Span::styled(error.clone(), styles::error_style()))],
        (Some(status), None) => serde_json::to_string_pretty(status)
            .unwrap_or_default()
            .lines()
            .take(MAX_STATUS_LINES)
            .map(|l| Line::from(Span::styled(l.to_string(), styles::text_style())))
            .collect(),
        (None, None) => vec![Line::from(Span::styled("Loading...", styles::muted_style()))],
    };
    let status_block = Block::default()
        .title(" Microsoft connection ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(status_lines).block(status_block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}

fn field_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {:<7}", label), styles::muted_style()),
        Span::styled(value.to_string(), styles::text_style()),
    ])
}

/// Key hints for the status bar. Retry is only offered once the callback failed.
fn status_hints(screen: &Screen, awaiting_redirect: bool) -> &'static [(&'static str, &'static str)] {
    match screen {
        Screen::Login(_) if awaiting_redirect => &[("Enter", "submit"), ("Esc", "cancel")],
        Screen::Login(_) => &[("Enter", "connect"), ("q", "quit")],
        Screen::Callback(view) if matches!(view.state(), CallbackState::Error(_)) => {
            &[("Enter", "try again"), ("q", "quit")]
        }
        Screen::Callback(_) => &[("q", "quit")],
        Screen::Dashboard(_) => &[("r", "refresh"), ("l", "sign out"), ("q", "quit")],
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let hints = status_hints(&app.screen, app.awaiting_redirect);

    let mut spans = vec![Span::raw(" ")];
    if let Some(ref message) = app.status_message {
        spans.push(Span::styled(message.clone(), styles::status_bar_style()));
        spans.push(Span::raw("  "));
    }
    for (key, desc) in hints {
        spans.push(Span::styled(format!("[{}]", key), styles::help_key_style()));
        spans.push(Span::styled(format!(" {}  ", desc), styles::help_desc_style()));
    }
    spans.push(Span::styled(app.api_url.clone(), styles::muted_style()));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(styles::status_bar_style()),
        area,
    );
}

fn render_alert_overlay(frame: &mut Frame, message: &str) {
    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), styles::error_style())),
        Line::from(""),
        Line::from(Span::styled("[Enter] OK", styles::help_key_style())),
    ];
    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(styles::error_style());
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled("Are you sure you want to quit?", styles::text_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", styles::help_key_style()),
            Span::styled(" Yes   ", styles::help_desc_style()),
            Span::styled("[n]", styles::help_key_style()),
            Span::styled(" No", styles::help_desc_style()),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(
        Paragraph::new(lines).block(block).alignment(Alignment::Center),
        area,
    );
}

fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

/// The last `max` characters of `s`, so long pasted URLs show their end.
fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(max)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mailmind_core::auth::Session;
    use mailmind_core::nav::{History, Route};
    use mailmind_core::views::CallbackParams;

    use super::*;

    fn callback_screen() -> Screen {
        let session = Arc::new(Session::in_memory());
        let history = Arc::new(History::new(Route::Callback));
        Screen::Callback(CallbackView::new(session, history))
    }

    fn keys(hints: &[(&str, &str)]) -> Vec<String> {
        hints.iter().map(|(key, desc)| format!("{key} {desc}")).collect()
    }

    #[test]
    fn test_retry_hint_only_after_callback_failure() {
        let mut screen = callback_screen();
        assert_eq!(keys(status_hints(&screen, false)), vec!["q quit"]);

        if let Screen::Callback(ref mut view) = screen {
            view.process(&CallbackParams::from_query("error=access_denied"));
        }
        assert_eq!(
            keys(status_hints(&screen, false)),
            vec!["Enter try again", "q quit"]
        );
    }
}
