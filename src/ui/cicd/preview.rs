use crate::app::{App, Screen, Slot};
use crate::azure::{Run, TimelineRecord};
use crate::ui::{format_time, styled_block};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph, Wrap};

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    match app.screen {
        Screen::Pipelines => draw_pipeline_preview(f, app, area),
        Screen::Runs => {
            let run = app.run_state.selected().and_then(|i| app.runs.get(i)).cloned();
            draw_run_preview(f, app, run.as_ref(), area);
        }
        _ => draw_run_details(f, app, area),
    }
}

fn draw_pipeline_preview(f: &mut Frame, app: &App, area: Rect) {
    let block = styled_block("Preview".to_string(), false, &app.theme);

    let content = match app.pipeline_state.selected().and_then(|i| app.pipelines.get(i)) {
        Some(pipeline) => format!(
            "Pipeline: {}\n\
             ID: {}\n\
             Folder: {}\n\
             Revision: {}\n\n\
             Press [Enter] to view runs",
            pipeline.name,
            pipeline.id,
            pipeline.folder.as_deref().unwrap_or("\\"),
            pipeline.revision,
        ),
        None => "Select a pipeline to view details".to_string(),
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(app.theme.parse_color(&app.theme.text)));
    f.render_widget(paragraph, area);
}

fn run_summary<'a>(app: &App, run: &'a Run) -> Vec<Line<'a>> {
    let theme = &app.theme;
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(theme.parse_color(&theme.text));
    let status = Style::default().fg(theme.run_color(run));

    vec![
        Line::from(vec![
            Span::styled("Run: ", label),
            Span::styled(format!("#{}", run.name), value.add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::styled("Status: ", label),
            Span::styled(format!("{} {}", run.status_icon(), run.state.label()), status),
        ]),
        Line::from(vec![
            Span::styled("Result: ", label),
            Span::styled(run.result.as_deref().unwrap_or("-"), status),
        ]),
        Line::from(vec![
            Span::styled("Started: ", label),
            Span::styled(run.created_date.as_deref().map(format_time).unwrap_or_else(|| "-".to_string()), value),
        ]),
        Line::from(vec![
            Span::styled("Finished: ", label),
            Span::styled(run.finished_date.as_deref().map(format_time).unwrap_or_else(|| "-".to_string()), value),
        ]),
    ]
}

fn draw_run_preview(f: &mut Frame, app: &App, run: Option<&Run>, area: Rect) {
    let block = styled_block("Run Details".to_string(), false, &app.theme);

    let Some(run) = run else {
        let paragraph = Paragraph::new("Select a run to view details")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(paragraph, area);
        return;
    };

    let mut lines = run_summary(app, run);
    lines.push(Line::from(""));
    lines.push(Line::styled("Press [Enter] to view the timeline", Style::default().fg(Color::DarkGray)));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

/// Indent depth for a timeline record
fn depth(record: &TimelineRecord) -> usize {
    match record.record_type.as_deref() {
        Some("Stage") => 0,
        Some("Phase") | Some("Job") => 1,
        _ => 2,
    }
}

fn draw_run_details(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(run) = app.selected_run.clone() else {
        let block = styled_block("Timeline".to_string(), true, &app.theme);
        f.render_widget(Paragraph::new("No run selected").block(block), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let mut title = format!("Run #{}", run.name);
    if app.auto_selected {
        title.push_str(" (active run)");
    }
    let summary = Paragraph::new(run_summary(app, &run)).block(styled_block(title, false, &app.theme));
    f.render_widget(summary, chunks[0]);

    let refresh = if app.auto_refresh { " ⟳ every 3s" } else { "" };
    let title = format!("Timeline ({}){refresh}", app.timeline.len());
    let block = styled_block(title, true, &app.theme);

    if app.timeline.is_empty() {
        let msg = if app.is_loading(Slot::Timeline) {
            format!("  {} Loading timeline...", app.spinner_char())
        } else {
            "  No timeline records yet.".to_string()
        };
        let paragraph = Paragraph::new(msg)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(paragraph, chunks[1]);
        return;
    }

    let selected = app.timeline_state.selected();
    let theme = &app.theme;
    let items: Vec<ListItem> = app
        .timeline
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let color = theme.record_color(record.state.as_deref(), record.result.as_deref());
            let name_style = if selected == Some(i) {
                Style::default()
                    .fg(theme.parse_color(&theme.highlight))
                    .add_modifier(Modifier::BOLD)
            } else if depth(record) == 0 {
                Style::default()
                    .fg(theme.parse_color(&theme.text))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.parse_color(&theme.text))
            };
            let indent = "  ".repeat(depth(record));
            let name = record.name.as_deref().unwrap_or("Unnamed");
            let outcome = record.result.as_deref().or(record.state.as_deref()).unwrap_or("");

            ListItem::new(Line::from(vec![
                Span::raw(indent),
                Span::styled(record.status_icon(), Style::default().fg(color)),
                Span::raw(" "),
                Span::styled(name, name_style),
                Span::styled(format!("  {outcome}"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    f.render_stateful_widget(List::new(items).block(block), chunks[1], &mut app.timeline_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_depth() {
        let record = |kind: &str| TimelineRecord {
            record_type: Some(kind.to_string()),
            ..Default::default()
        };
        assert_eq!(depth(&record("Stage")), 0);
        assert_eq!(depth(&record("Job")), 1);
        assert_eq!(depth(&record("Task")), 2);
        assert_eq!(depth(&TimelineRecord::default()), 2, "Untyped records indent as tasks");
    }
}
