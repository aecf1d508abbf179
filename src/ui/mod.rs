mod browse;
mod cicd;
mod help;
mod input;
mod prs;

use crate::app::{App, Screen, Slot};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Main vertical layout: header (3) + content + status bar (1)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Breadcrumb
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status/help bar
        ])
        .split(size);

    draw_header(f, app, chunks[0]);

    match app.screen {
        Screen::Browse(_) => browse::draw(f, app, chunks[1]),
        Screen::RepoOptions => browse::draw_repo_options(f, app, chunks[1]),
        Screen::Pipelines | Screen::Runs | Screen::RunDetails => cicd::draw(f, app, chunks[1]),
        Screen::PullRequests | Screen::PrDetails | Screen::CreatePr | Screen::OverridePr => {
            prs::draw(f, app, chunks[1])
        }
    }

    draw_status_bar(f, app, chunks[2]);

    // Overlays
    if app.show_help {
        help::draw_popup(f, app, size);
    }
    if app.config_modal.is_some() {
        input::draw_config_modal(f, app, size);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let muted = Style::default().fg(theme.parse_color(&theme.text_muted));
    let strong = Style::default()
        .fg(theme.parse_color(&theme.highlight))
        .add_modifier(Modifier::BOLD);

    let org = app
        .config
        .azure_org_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut crumbs: Vec<String> = vec![org];
    if let Some(project) = &app.selected_project {
        crumbs.push(project.name.clone());
    }
    if let Some(repo) = &app.selected_repo {
        crumbs.push(repo.name.clone());
    }
    match app.screen {
        Screen::Pipelines | Screen::Runs | Screen::RunDetails => {
            crumbs.push("Pipelines".to_string());
            if let Some(pipeline) = &app.selected_pipeline {
                if app.screen != Screen::Pipelines {
                    crumbs.push(pipeline.name.clone());
                }
            }
            if let (Screen::RunDetails, Some(run)) = (app.screen, &app.selected_run) {
                crumbs.push(run.name.clone());
            }
        }
        Screen::PullRequests | Screen::PrDetails | Screen::CreatePr | Screen::OverridePr => {
            crumbs.push("Pull Requests".to_string());
            if let (Screen::PrDetails | Screen::OverridePr, Some(pr)) = (app.screen, &app.selected_pr) {
                crumbs.push(format!("#{}", pr.pull_request_id));
            }
        }
        _ => {}
    }

    let last = crumbs.len().saturating_sub(1);
    let mut spans: Vec<Span> = Vec::new();
    for (i, crumb) in crumbs.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", muted));
        }
        spans.push(Span::styled(crumb, if i == last { strong } else { muted }));
    }

    if app.auto_refresh {
        spans.push(Span::styled("  ⟳ live", Style::default().fg(theme.parse_color(&theme.running))));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.parse_color(&theme.border)))
        .title(" aztui ");
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    if let Some(msg) = &app.status_message {
        let color = if app.status_is_error {
            theme.parse_color(&theme.failure)
        } else {
            theme.parse_color(&theme.text_muted)
        };
        f.render_widget(Paragraph::new(msg.as_str()).style(Style::default().fg(color)), area);
        return;
    }

    let hints = match app.screen {
        Screen::Browse(_) if app.search.is_some() => "type:filter  ↑/↓:select  Enter:open  Esc:cancel",
        Screen::Browse(_) => "j/k:nav  Enter:open  Tab:panel  /:search  r:refresh  ?:help  q:quit",
        Screen::RepoOptions => "j/k:nav  Enter:open  Esc:back  ?:help  q:quit",
        Screen::Pipelines => "j/k:nav  Enter:runs  Esc:back  r:refresh  ?:help  q:quit",
        Screen::Runs => "j/k:nav  Enter:details  Esc:back  r:refresh  ?:help  q:quit",
        Screen::RunDetails => "j/k:nav  r:refresh  Esc:back  ?:help  q:quit",
        Screen::PullRequests => "j/k:nav  Enter:details  n:new PR  Esc:back  r:refresh  ?:help  q:quit",
        Screen::PrDetails => "j/k:scroll  a:approve  d:decline  c:complete  o:override  n:new PR  Esc:back  ?:help",
        Screen::CreatePr => "Tab:next field  Enter:create  Ctrl+s:create  Esc:cancel",
        Screen::OverridePr => "Enter:complete with override  Esc:cancel",
    };

    let mut spans = Vec::new();
    if app.any_loading() {
        spans.push(Span::styled(
            format!("{} ", app.spinner_char()),
            Style::default().fg(theme.parse_color(&theme.running)),
        ));
    }
    spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray)));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Placeholder line for an empty or still-loading list
pub fn empty_message(app: &App, slot: Slot, empty: &str) -> String {
    if app.is_loading(slot) {
        format!("  {} Loading...", app.spinner_char())
    } else {
        format!("  {empty}")
    }
}

// Helper: create a centered rect
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

// Helper: styled block with focus indicator
pub fn styled_block<'a>(title: String, focused: bool, theme: &crate::config::Theme) -> Block<'a> {
    let border_color = if focused {
        theme.parse_color(&theme.border_active)
    } else {
        theme.parse_color(&theme.border)
    };

    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {title} "))
}

/// Row prefix and text style for a list entry
pub fn row_style(selected: bool, focused: bool, theme: &crate::config::Theme) -> (&'static str, Style) {
    if selected && focused {
        (
            "▸ ",
            Style::default()
                .fg(theme.parse_color(&theme.highlight))
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("  ", Style::default().fg(theme.parse_color(&theme.text)))
    }
}

/// "2026-10-19T08:15:00Z" -> "19.10.2026 08:15"
pub fn format_time(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(50, 10, area);
        assert_eq!(rect, Rect::new(25, 15, 50, 10));

        let small = Rect::new(0, 0, 20, 5);
        let clipped = centered_rect(50, 10, small);
        assert_eq!((clipped.width, clipped.height), (20, 5), "Never larger than the area");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time("2026-10-19T08:15:00Z"), "19.10.2026 08:15");
        assert_eq!(format_time("not a date"), "not a date");
    }
}
