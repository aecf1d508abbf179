use super::{empty_message, row_style, styled_block};
use crate::app::{App, Panel, Screen, Slot, REPO_OPTIONS};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    draw_panel(f, app, Panel::Projects, chunks[0]);
    draw_panel(f, app, Panel::Repos, chunks[1]);
}

fn draw_panel(f: &mut Frame, app: &mut App, panel: Panel, area: Rect) {
    let focused = app.screen == Screen::Browse(panel);
    let searching = focused && app.search.as_ref().is_some_and(|s| s.panel == panel);

    let list_area = if searching {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        draw_search_input(f, app, chunks[0]);
        chunks[1]
    } else {
        area
    };

    if searching {
        draw_search_hits(f, app, panel, list_area);
        return;
    }

    match panel {
        Panel::Projects => {
            let title = format!("Projects ({})", app.projects.len());
            let block = styled_block(title, focused, &app.theme);
            if app.projects.is_empty() {
                let msg = empty_message(app, Slot::Projects, "No projects. Press 'r' to refresh.");
                f.render_widget(Paragraph::new(msg).block(block).style(Style::default().fg(Color::DarkGray)), list_area);
                return;
            }
            let selected = app.project_state.selected();
            let selected_id = app.selected_project.as_ref().map(|p| p.id.as_str());
            let items: Vec<ListItem> = app
                .projects
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let (prefix, style) = row_style(selected == Some(i), focused, &app.theme);
                    let marker = if selected_id == Some(p.id.as_str()) { "● " } else { "  " };
                    ListItem::new(Line::from(vec![
                        Span::raw(prefix),
                        Span::styled(marker, Style::default().fg(app.theme.parse_color(&app.theme.success))),
                        Span::styled(p.name.as_str(), style),
                    ]))
                })
                .collect();
            f.render_stateful_widget(List::new(items).block(block), list_area, &mut app.project_state);
        }
        Panel::Repos => {
            let project = app.selected_project.as_ref().map(|p| p.name.as_str()).unwrap_or("-");
            let title = format!("Repositories - {project} ({})", app.repos.len());
            let block = styled_block(title, focused, &app.theme);
            if app.repos.is_empty() {
                let empty = if app.selected_project.is_some() {
                    "No repositories."
                } else {
                    "Select a project first."
                };
                let msg = empty_message(app, Slot::Repos, empty);
                f.render_widget(Paragraph::new(msg).block(block).style(Style::default().fg(Color::DarkGray)), list_area);
                return;
            }
            let selected = app.repo_state.selected();
            let items: Vec<ListItem> = app
                .repos
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let (prefix, style) = row_style(selected == Some(i), focused, &app.theme);
                    let branch = r
                        .default_branch
                        .as_deref()
                        .map(crate::azure::PullRequest::short_branch)
                        .unwrap_or("");
                    ListItem::new(Line::from(vec![
                        Span::raw(prefix),
                        Span::styled(r.name.as_str(), style),
                        Span::styled(format!("  {branch}"), Style::default().fg(Color::DarkGray)),
                    ]))
                })
                .collect();
            f.render_stateful_widget(List::new(items).block(block), list_area, &mut app.repo_state);
        }
    }
}

fn draw_search_input(f: &mut Frame, app: &App, area: Rect) {
    let query = app.search.as_ref().map(|s| s.query.as_str()).unwrap_or_default();
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Search (Enter to open, Esc to cancel) ")
        .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let input = Paragraph::new(format!("🔍 {query}"))
        .block(input_block)
        .style(Style::default().fg(Color::White));
    f.render_widget(input, area);

    // Position cursor after the icon
    let cursor_x = area.x + 4 + query.chars().count() as u16;
    if cursor_x < area.x + area.width.saturating_sub(1) {
        f.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn draw_search_hits(f: &mut Frame, app: &App, panel: Panel, area: Rect) {
    let hits = app.search_hits();
    let total = match panel {
        Panel::Projects => app.projects.len(),
        Panel::Repos => app.repos.len(),
    };
    let label = match panel {
        Panel::Projects => "Projects",
        Panel::Repos => "Repositories",
    };
    let block = styled_block(format!("{label} ({}/{total})", hits.len()), true, &app.theme);

    if hits.is_empty() {
        let msg = Paragraph::new("  No matches. Press Esc to cancel.")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(msg, area);
        return;
    }

    let cursor = app.search.as_ref().map(|s| s.cursor).unwrap_or(0).min(hits.len() - 1);
    let items: Vec<ListItem> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let (prefix, style) = row_style(i == cursor, true, &app.theme);
            ListItem::new(Line::from(vec![Span::raw(prefix), Span::styled(hit.name(), style)]))
        })
        .collect();

    let mut state = ListState::default().with_selected(Some(cursor));
    f.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

pub fn draw_repo_options(f: &mut Frame, app: &mut App, area: Rect) {
    let repo = app.selected_repo.as_ref().map(|r| r.name.clone()).unwrap_or_default();
    let block = styled_block(format!("{repo} [Esc:back]"), true, &app.theme);

    let selected = app.repo_option_state.selected();
    let items: Vec<ListItem> = REPO_OPTIONS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let (prefix, style) = row_style(selected == Some(i), true, &app.theme);
            let icon = if i == 0 { "⚙ " } else { "⇄ " };
            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(icon, Style::default().fg(Color::DarkGray)),
                Span::styled(*label, style),
            ]))
        })
        .collect();

    let width = area.width.min(50);
    let menu_area = Rect::new(area.x, area.y, width, area.height.min(REPO_OPTIONS.len() as u16 + 2));
    f.render_stateful_widget(List::new(items).block(block), menu_area, &mut app.repo_option_state);
}
