use crate::app::{App, Screen, Slot};
use crate::azure::{PullRequest, Reviewer};
use crate::ui::{empty_message, row_style, styled_block};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph};

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.screen == Screen::PullRequests;
    let repo_name = app
        .selected_repo
        .as_ref()
        .map(|r| r.name.clone())
        .unwrap_or_else(|| "Repo".to_string());
    let title = format!("Active PRs ({}) [{repo_name}]", app.pull_requests.len());
    let block = styled_block(title, focused, &app.theme);

    if app.pull_requests.is_empty() {
        let msg = empty_message(app, Slot::PullRequests, "No active PRs. Press 'n' to create one.");
        let list = Paragraph::new(msg)
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(list, area);
        return;
    }

    let selected = app.pr_state.selected();
    let theme = &app.theme;
    let items: Vec<ListItem> = app
        .pull_requests
        .iter()
        .enumerate()
        .map(|(i, pr)| {
            let (prefix, style) = row_style(selected == Some(i), focused, theme);
            let status_color = if pr.is_draft {
                theme.parse_color(&theme.warning)
            } else {
                theme.parse_color(&theme.success)
            };
            let draft = if pr.is_draft { " [DRAFT]" } else { "" };
            let author = pr
                .created_by
                .as_ref()
                .map(|c| initials(&c.display_name))
                .unwrap_or_default();

            // Truncate title to fit in available space
            let max_title_len = area.width.saturating_sub(30) as usize;
            let display_title = truncate(&pr.title, max_title_len);

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(pr.status_icon(), Style::default().fg(status_color)),
                Span::raw(" "),
                Span::styled(format!("#{}", pr.pull_request_id), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(display_title, style),
                Span::styled(draft, Style::default().fg(theme.parse_color(&theme.warning))),
                Span::raw(" "),
                Span::styled(vote_summary(&pr.reviewers), Style::default().fg(Color::Magenta)),
                Span::raw(" "),
                Span::styled(author, Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!(" → {}", PullRequest::short_branch(&pr.target_ref_name)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    f.render_stateful_widget(List::new(items).block(block), area, &mut app.pr_state);
}

/// "Ada Lovelace" -> "AL"
fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Reviewer votes as a compact icon strip
fn vote_summary(reviewers: &[Reviewer]) -> String {
    if reviewers.is_empty() {
        return String::new();
    }
    let icons: Vec<&str> = reviewers
        .iter()
        .map(|r| PullRequest::vote_icon(r.vote))
        .collect();
    format!("[{}]", icons.join(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("grace brewster hopper"), "GB");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Überarbeitung der Pipeline", 10), "Überarb...");
    }

    #[test]
    fn test_vote_summary() {
        let reviewer = |vote| Reviewer {
            vote,
            ..Default::default()
        };
        assert_eq!(vote_summary(&[]), "");
        assert_eq!(vote_summary(&[reviewer(10), reviewer(-10), reviewer(0)]), "[✓✗○]");
    }
}
