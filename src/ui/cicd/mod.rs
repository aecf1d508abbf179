mod pipelines;
mod preview;

use crate::app::{App, Screen};
use ratatui::prelude::*;

pub fn draw(f: &mut Frame, app: &mut App, area: Rect) {
    // Horizontal split: list (45%) + preview (55%)
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    match app.screen {
        Screen::Pipelines => pipelines::draw_pipeline_list(f, app, chunks[0]),
        _ => pipelines::draw_run_list(f, app, chunks[0]),
    }
    preview::draw(f, app, chunks[1]);
}
