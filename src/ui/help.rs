use crate::app::{App, Screen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub fn draw_popup(f: &mut Frame, app: &App, area: Rect) {
    let (title, help_text) = match app.screen {
        Screen::Browse(_) | Screen::RepoOptions => (
            " Browse Help - Press any key to close ",
            r#"
NAVIGATION
  j/k ↑/↓       Move up/down
  g/G           Go to top/bottom
  Tab           Switch Projects/Repos panel
  Enter l →     Select project / open repo
  Esc h ←       Go back

SEARCH
  /             Filter the focused panel
  Enter         Jump to the highlighted match
  Esc           Cancel and restore cursor

ACTIONS
  r             Reload focused panel
  ?             Toggle help
  q Ctrl+c      Quit
"#,
        ),
        Screen::Pipelines | Screen::Runs | Screen::RunDetails => (
            " CI/CD Help - Press any key to close ",
            r#"
NAVIGATION
  j/k ↑/↓       Move up/down
  g/G           Go to top/bottom
  Enter l →     Open runs / timeline
  Esc h ←       Go back

TIMELINE
  Active runs refresh every 3 seconds
  until they finish or you leave.

ACTIONS
  r             Refresh
  ?             Toggle help
  q Ctrl+c      Quit
"#,
        ),
        Screen::PullRequests | Screen::PrDetails | Screen::CreatePr | Screen::OverridePr => (
            " Pull Requests Help - Press any key to close ",
            r#"
NAVIGATION
  j/k ↑/↓       Move up/down / scroll details
  g/G           Go to top/bottom
  Enter l →     View PR details
  Esc h ←       Go back

PULL REQUESTS
  n             New pull request
  a             Approve
  d             Decline
  c             Complete (merge commit)
  o             Complete with policy override
  r             Refresh

NEW PR FORM
  Tab/S-Tab     Next/previous field
  ↑/↓           Pick branch or reviewer
  Enter         Add reviewer / submit
  Ctrl+s        Create
  Esc           Cancel
"#,
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.parse_color(&app.theme.border_active)))
        .title(title);

    let inner = super::centered_rect(52, 30, area);
    f.render_widget(Clear, inner);

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, inner);
}
