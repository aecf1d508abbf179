use crate::app::{App, Screen, Slot};
use crate::azure::{CommentThread, PullRequest};
use crate::ui::{format_time, styled_block};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = matches!(app.screen, Screen::PrDetails | Screen::OverridePr);

    // Loaded detail when viewing a PR, otherwise the row under the cursor
    let pr = if focused {
        app.pr_detail.as_ref().map(|d| &d.pr)
    } else {
        app.pr_state.selected().and_then(|i| app.pull_requests.get(i))
    };

    let title = if focused { "PR Details [Esc:back]" } else { "Preview" };
    let block = styled_block(title.to_string(), focused, &app.theme);

    let Some(pr) = pr else {
        let msg = if focused && app.is_loading(Slot::PrDetail) {
            format!("{} Loading PR details...", app.spinner_char())
        } else if focused {
            "PR details unavailable. Press 'r' to retry.".to_string()
        } else {
            "Select a PR to view details".to_string()
        };
        let paragraph = Paragraph::new(msg)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(paragraph, area);
        return;
    };

    let inner = block.inner(area);
    let mut lines: Vec<Line> = Vec::new();
    if focused {
        lines.extend(action_lines(app));
    }
    lines.extend(detail_lines(app, pr));
    if focused {
        if let Some(detail) = &app.pr_detail {
            lines.extend(thread_lines(app, &detail.threads, inner.width as usize));
        }
    }

    let line_count = lines.len() as u16;
    let scroll = if focused { app.pr_scroll.min(line_count.saturating_sub(1)) } else { 0 };
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);

    if line_count > inner.height {
        let mut scrollbar_state =
            ScrollbarState::new(line_count.saturating_sub(inner.height) as usize).position(scroll as usize);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }

    // Keep the offset within the content so scrolling back responds at once
    if focused {
        app.pr_scroll = scroll;
    }
}

/// Last action result plus the available action keys
fn action_lines(app: &App) -> Vec<Line<'static>> {
    let theme = &app.theme;
    let mut lines = Vec::new();

    if let Some(message) = app.visible_action_message() {
        lines.push(Line::styled(
            message.to_string(),
            Style::default()
                .fg(theme.message_color(message))
                .add_modifier(Modifier::BOLD),
        ));
    }

    let hint = if app.is_loading(Slot::PrAction) {
        format!("{} Working...", app.spinner_char())
    } else if app.pr_actions_enabled() {
        "[a] approve  [d] decline  [c] complete  [o] override".to_string()
    } else {
        "Actions unavailable: PR is not active".to_string()
    };
    lines.push(Line::styled(hint, Style::default().fg(Color::DarkGray)));
    lines.push(Line::from(""));
    lines
}

fn detail_lines<'a>(app: &App, pr: &'a PullRequest) -> Vec<Line<'a>> {
    let theme = &app.theme;
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(theme.parse_color(&theme.text));

    let status = match pr.status {
        crate::azure::PrStatus::Active => "● Active",
        crate::azure::PrStatus::Completed => "✓ Completed",
        crate::azure::PrStatus::Abandoned => "✗ Abandoned",
        crate::azure::PrStatus::NotSet => "Unknown",
    };
    let created_by = pr
        .created_by
        .as_ref()
        .map(|c| c.display_name.as_str())
        .unwrap_or("Unknown");
    let date = pr
        .creation_date
        .as_deref()
        .map(format_time)
        .unwrap_or_else(|| "Unknown".to_string());

    let mut lines = vec![
        Line::styled(
            pr.title.as_str(),
            value.add_modifier(Modifier::BOLD),
        ),
        Line::from(vec![
            Span::styled("ID: ", label),
            Span::styled(format!("#{}", pr.pull_request_id), value),
        ]),
        Line::from(vec![
            Span::styled("Branch: ", label),
            Span::styled(
                format!(
                    "{} → {}",
                    PullRequest::short_branch(&pr.source_ref_name),
                    PullRequest::short_branch(&pr.target_ref_name)
                ),
                value,
            ),
        ]),
        Line::from(vec![Span::styled("Status: ", label), Span::styled(status, value)]),
        Line::from(vec![
            Span::styled("Merge: ", label),
            Span::styled(pr.merge_status.as_deref().unwrap_or("-"), value),
        ]),
        Line::from(vec![
            Span::styled("Created by: ", label),
            Span::styled(format!("{created_by} on {date}"), value),
        ]),
        Line::from(""),
        Line::styled("── Reviewers ──", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    ];

    if pr.reviewers.is_empty() {
        lines.push(Line::styled("  No reviewers", label));
    }
    for reviewer in &pr.reviewers {
        let required = if reviewer.is_required.unwrap_or(false) { " (required)" } else { "" };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
                PullRequest::vote_icon(reviewer.vote),
                Style::default().fg(theme.vote_color(reviewer.vote)),
            ),
            Span::raw(" "),
            Span::styled(reviewer.display_name.as_str(), value),
            Span::styled(
                format!(" - {}{required}", PullRequest::vote_label(reviewer.vote)),
                label,
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::styled("── Description ──", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let description = pr
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("No description");
    lines.extend(description.lines().map(|l| Line::styled(l, value)));
    lines
}

fn thread_lines<'a>(app: &App, threads: &'a [CommentThread], width: usize) -> Vec<Line<'a>> {
    let theme = &app.theme;
    let mut lines = vec![
        Line::from(""),
        Line::styled(
            format!("── Comments ({}) ──", threads.len()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    ];
    if threads.is_empty() {
        lines.push(Line::styled("  No comments", Style::default().fg(Color::DarkGray)));
        return lines;
    }

    for thread in threads {
        let (icon, color) = match thread.status.as_deref() {
            Some("active") => ("●", theme.parse_color(&theme.success)),
            Some("pending") => ("◐", theme.parse_color(&theme.warning)),
            _ => ("✓", Color::DarkGray),
        };
        for (i, comment) in thread
            .comments
            .iter()
            .filter(|c| c.comment_type.as_deref() != Some("system"))
            .enumerate()
        {
            let author = comment
                .author
                .as_ref()
                .map(|a| a.display_name.as_str())
                .unwrap_or("Unknown");
            let when = comment.published_date.as_deref().map(format_time).unwrap_or_default();
            let lead = if i == 0 { Span::styled(icon, Style::default().fg(color)) } else { Span::raw("↳") };
            lines.push(Line::from(vec![
                Span::raw("  "),
                lead,
                Span::raw(" "),
                Span::styled(author, Style::default().fg(Color::Yellow)),
                Span::styled(format!("  {when}"), Style::default().fg(Color::DarkGray)),
            ]));
            let body = comment.content.as_deref().unwrap_or("(empty)");
            for text in indented(body, width) {
                lines.push(Line::styled(text, Style::default().fg(theme.parse_color(&theme.text))));
            }
        }
    }
    lines
}

/// Comment body wrapped to the pane, keeping the indent on continuation lines
fn indented(body: &str, width: usize) -> Vec<String> {
    let options = textwrap::Options::new(width.max(8))
        .initial_indent("    ")
        .subsequent_indent("    ");
    body.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, &options)
                    .into_iter()
                    .map(|l| l.into_owned())
                    .collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indented_wraps_with_indent() {
        let lines = indented("one two three four", 14);
        assert_eq!(lines, vec!["    one two", "    three four"]);
    }

    #[test]
    fn test_scroll_past_end_is_clamped_in_state() {
        use crate::azure::PullRequestDetail;
        use crate::config::Config;
        use ratatui::backend::TestBackend;

        let mut app = App::new(Config::default());
        app.screen = Screen::PrDetails;
        app.pr_detail = Some(PullRequestDetail {
            pr: PullRequest {
                pull_request_id: 7,
                title: "Short".to_string(),
                ..Default::default()
            },
            threads: Vec::new(),
        });
        app.pr_scroll = 500;

        let mut terminal = Terminal::new(TestBackend::new(60, 40)).unwrap();
        terminal.draw(|f| draw(f, &mut app, f.area())).unwrap();
        assert!(app.pr_scroll < 30, "Offset pulled back to the content, got {}", app.pr_scroll);

        let clamped = app.pr_scroll;
        app.pr_scroll = clamped.saturating_sub(1);
        terminal.draw(|f| draw(f, &mut app, f.area())).unwrap();
        assert_eq!(app.pr_scroll, clamped - 1, "One step back moves one line");
    }

    #[test]
    fn test_indented_keeps_blank_lines() {
        let lines = indented("first\n\nsecond", 40);
        assert_eq!(lines, vec!["    first", "", "    second"], "Paragraph breaks survive wrapping");
    }
}
