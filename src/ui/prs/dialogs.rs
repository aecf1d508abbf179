use crate::app::{App, Slot};
use crate::azure::Branch;
use crate::forms::{PrField, PrForm};
use crate::ui::centered_rect;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

pub fn draw_create_pr(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(form) = app.pr_form.as_ref() else {
        return;
    };
    let theme = &app.theme;

    let popup = centered_rect(76, 26, area);
    f.render_widget(Clear, popup);

    let repo = app.selected_repo.as_ref().map(|r| r.name.as_str()).unwrap_or("repo");
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.parse_color(&theme.border_active)))
        .title(format!(" New Pull Request - {repo} "))
        .title_bottom(" Tab:next field  Ctrl+S:create  Esc:cancel ");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Description
            Constraint::Length(7), // Branches
            Constraint::Min(5),    // Reviewers
            Constraint::Length(1), // Status line
        ])
        .split(inner);

    let field_block = |field: PrField| {
        let active = form.field == field;
        let color = if active {
            theme.parse_color(&theme.border_active)
        } else {
            theme.parse_color(&theme.border)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} ", field.label()))
    };

    f.render_widget(
        Paragraph::new(form.title.as_str()).block(field_block(PrField::Title)),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(form.description.as_str()).block(field_block(PrField::Description)),
        chunks[1],
    );

    let branch_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    let branches_loading = app.is_loading(Slot::Branches);
    for (col, field, selected) in [
        (branch_cols[0], PrField::Source, form.source),
        (branch_cols[1], PrField::Target, form.target),
    ] {
        let block = field_block(field);
        if form.branches.is_empty() {
            let msg = if branches_loading {
                format!("{} Loading branches...", app.spinner_char())
            } else {
                "No branches".to_string()
            };
            f.render_widget(
                Paragraph::new(msg).block(block).style(Style::default().fg(Color::DarkGray)),
                col,
            );
            continue;
        }
        let mut state = ListState::default().with_selected(selected);
        f.render_stateful_widget(
            branch_list(&form.branches, form.field == field, app).block(block),
            col,
            &mut state,
        );
    }

    draw_reviewers(f, app, form, chunks[3], field_block(PrField::Reviewers));

    let status = if form.submitting {
        Line::styled(
            format!("{} Creating pull request...", app.spinner_char()),
            Style::default().fg(theme.parse_color(&theme.running)),
        )
    } else if let Some(err) = &form.error {
        Line::styled(err.as_str(), Style::default().fg(theme.parse_color(&theme.failure)))
    } else {
        Line::styled(
            match (form.source_branch(), form.target_branch()) {
                (Some(s), Some(t)) => format!("{} → {}", s.short_name(), t.short_name()),
                _ => "Pick a source and target branch".to_string(),
            },
            Style::default().fg(Color::DarkGray),
        )
    };
    f.render_widget(Paragraph::new(status), chunks[4]);

    // Text cursor for the editable fields
    let (target, text) = match form.field {
        PrField::Title => (chunks[0], form.title.as_str()),
        PrField::Description => (chunks[1], form.description.as_str()),
        _ => return,
    };
    if !form.submitting {
        let x = (target.x + 1 + text.chars().count() as u16).min(target.right().saturating_sub(2));
        f.set_cursor_position(Position::new(x, target.y + 1));
    }
}

fn branch_list<'a>(branches: &'a [Branch], active: bool, app: &App) -> List<'a> {
    let theme = &app.theme;
    let items: Vec<ListItem> = branches
        .iter()
        .map(|b| ListItem::new(b.short_name()))
        .collect();
    let highlight = if active {
        Style::default()
            .bg(theme.parse_color(&theme.selected_bg))
            .fg(theme.parse_color(&theme.highlight))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    List::new(items).highlight_style(highlight).highlight_symbol("▸ ")
}

fn draw_reviewers(f: &mut Frame, app: &App, form: &PrForm, area: Rect, block: Block) {
    let theme = &app.theme;
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let chosen = if form.reviewers.is_empty() {
        Line::styled("No reviewers added", Style::default().fg(Color::DarkGray))
    } else {
        Line::from(
            form.reviewers
                .iter()
                .flat_map(|r| {
                    [
                        Span::styled(
                            format!(" {} ", r.display_name),
                            Style::default()
                                .fg(theme.parse_color(&theme.text))
                                .bg(theme.parse_color(&theme.selected_bg)),
                        ),
                        Span::raw(" "),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    };
    f.render_widget(Paragraph::new(chosen).wrap(Wrap { trim: true }), rows[0]);

    let active = form.field == PrField::Reviewers;
    f.render_widget(Paragraph::new(format!("🔍 {}", form.reviewer_query)), rows[1]);
    if active && !form.submitting {
        f.set_cursor_position(Position::new(
            rows[1].x + 3 + form.reviewer_query.chars().count() as u16,
            rows[1].y,
        ));
    }

    if form.users.is_empty() {
        let msg = if app.is_loading(Slot::Users) {
            format!("{} Loading users...", app.spinner_char())
        } else {
            "No users available".to_string()
        };
        f.render_widget(Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)), rows[2]);
        return;
    }

    let candidates = form.reviewer_candidates();
    let items: Vec<ListItem> = candidates
        .iter()
        .map(|u| {
            ListItem::new(Line::from(vec![
                Span::raw(u.display_name.as_str()),
                Span::styled(format!("  {}", u.mail_address), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let mut state = ListState::default();
    if active && !candidates.is_empty() {
        state.select(Some(form.reviewer_cursor.min(candidates.len() - 1)));
    }
    let list = List::new(items)
        .highlight_style(Style::default().bg(theme.parse_color(&theme.selected_bg)))
        .highlight_symbol("+ ");
    f.render_stateful_widget(list, rows[2], &mut state);
}

pub fn draw_override(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(form) = app.override_form.as_ref() else {
        return;
    };
    let theme = &app.theme;

    let popup = centered_rect(60, 9, area);
    f.render_widget(Clear, popup);

    let pr_id = app.selected_pr.as_ref().map(|p| p.pull_request_id).unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.parse_color(&theme.warning)))
        .title(format!(" Complete PR #{pr_id} with policy override "))
        .title_bottom(" Enter:complete  Esc:cancel ");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    f.render_widget(
        Paragraph::new("Bypass reason:").style(Style::default().fg(Color::DarkGray)),
        chunks[0],
    );
    let input = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.parse_color(&theme.border_active)));
    f.render_widget(Paragraph::new(form.reason.as_str()).block(input), chunks[1]);

    let status = if form.submitting {
        Line::styled(
            format!("{} Completing...", app.spinner_char()),
            Style::default().fg(theme.parse_color(&theme.running)),
        )
    } else if let Some(err) = &form.error {
        Line::styled(err.as_str(), Style::default().fg(theme.parse_color(&theme.failure)))
    } else {
        Line::raw("")
    };
    f.render_widget(Paragraph::new(status), chunks[2]);

    if !form.submitting {
        let x = (chunks[1].x + 1 + form.reason.chars().count() as u16)
            .min(chunks[1].right().saturating_sub(2));
        f.set_cursor_position(Position::new(x, chunks[1].y + 1));
    }
}
