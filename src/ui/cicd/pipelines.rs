use crate::app::{App, Screen, Slot};
use crate::ui::{empty_message, format_time, row_style, styled_block};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph};

pub fn draw_pipeline_list(f: &mut Frame, app: &mut App, area: Rect) {
    let repo = app
        .selected_repo
        .as_ref()
        .map(|r| r.name.clone())
        .unwrap_or_else(|| "Repo".to_string());
    let title = format!("Pipelines - {repo} ({}) [Esc:back]", app.pipelines.len());
    let block = styled_block(title, true, &app.theme);

    if app.pipelines.is_empty() {
        let msg = empty_message(app, Slot::Pipelines, "No pipelines. Press 'r' to refresh.");
        let list = Paragraph::new(msg)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(list, area);
        return;
    }

    let selected = app.pipeline_state.selected();
    let items: Vec<ListItem> = app
        .pipelines
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (prefix, style) = row_style(selected == Some(i), true, &app.theme);
            let folder = p
                .folder
                .as_deref()
                .filter(|folder| *folder != "\\")
                .unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled("● ", Style::default().fg(app.theme.parse_color(&app.theme.success))),
                Span::styled(p.name.as_str(), style),
                Span::styled(format!("  {folder}"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    f.render_stateful_widget(List::new(items).block(block), area, &mut app.pipeline_state);
}

pub fn draw_run_list(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.screen == Screen::Runs;
    let pipeline_name = app
        .selected_pipeline
        .as_ref()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Pipeline".to_string());
    let title = format!("{pipeline_name} - Runs ({}) [Esc:back]", app.runs.len());
    let block = styled_block(title, focused, &app.theme);

    if app.runs.is_empty() {
        let msg = empty_message(app, Slot::Runs, "No runs found.");
        let list = Paragraph::new(msg)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(list, area);
        return;
    }

    let selected = app.run_state.selected();
    let viewing = app.selected_run.as_ref().map(|r| r.id);
    let theme = &app.theme;
    let items: Vec<ListItem> = app
        .runs
        .iter()
        .enumerate()
        .map(|(i, run)| {
            let (prefix, mut style) = row_style(selected == Some(i), focused, theme);
            if !focused && viewing == Some(run.id) {
                style = style.add_modifier(Modifier::BOLD);
            }
            let created = run.created_date.as_deref().map(format_time).unwrap_or_default();

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(run.status_icon(), Style::default().fg(theme.run_color(run))),
                Span::raw(" "),
                Span::styled(format!("#{}", run.name), style),
                Span::raw("  "),
                Span::styled(run.state.label(), Style::default().fg(theme.run_color(run))),
                Span::styled(format!("  {created}"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    f.render_stateful_widget(List::new(items).block(block), area, &mut app.run_state);
}
