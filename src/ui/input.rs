use crate::app::App;
use crate::config::Config;
use crate::forms::ConfigField;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Organization URL and PAT prompt shown until both are set
pub fn draw_config_modal(f: &mut Frame, app: &App, area: Rect) {
    let Some(form) = app.config_modal.as_ref() else {
        return;
    };
    let theme = &app.theme;

    let popup = super::centered_rect(64, 13, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.parse_color(&theme.border_active)))
        .title(" Azure DevOps Configuration ")
        .title_bottom(" Tab:switch field  Enter:save  Esc:cancel ");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Org URL
            Constraint::Length(3), // PAT
            Constraint::Length(1), // Error
            Constraint::Min(1),    // Save location
        ])
        .split(inner);

    let masked = form.masked_pat();
    let fields = [
        (ConfigField::OrgUrl, "Organization URL", form.org_url.as_str(), chunks[0]),
        (ConfigField::Pat, "Personal Access Token", masked.as_str(), chunks[1]),
    ];
    for (field, label, value, rect) in fields {
        let color = if form.field == field {
            theme.parse_color(&theme.border_active)
        } else {
            theme.parse_color(&theme.border)
        };
        let input = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {label} "));
        f.render_widget(Paragraph::new(value).block(input), rect);

        if form.field == field {
            let x = (rect.x + 1 + value.chars().count() as u16).min(rect.right().saturating_sub(2));
            f.set_cursor_position(Position::new(x, rect.y + 1));
        }
    }

    if let Some(err) = &form.error {
        f.render_widget(
            Paragraph::new(err.as_str()).style(Style::default().fg(theme.parse_color(&theme.failure))),
            chunks[2],
        );
    }

    let location = Config::path()
        .map(|p| format!("Saved to {}", p.display()))
        .unwrap_or_else(|| "No home directory found; saving will fail".to_string());
    f.render_widget(
        Paragraph::new(location).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}
