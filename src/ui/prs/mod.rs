mod dialogs;
mod list;
mod preview;

use crate::app::{App, Screen};
use ratatui::prelude::*;

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    list::draw(f, app, chunks[0]);
    preview::draw(f, app, chunks[1]);

    match app.screen {
        Screen::CreatePr => dialogs::draw_create_pr(f, app, area),
        Screen::OverridePr => dialogs::draw_override(f, app, area),
        _ => {}
    }
}
