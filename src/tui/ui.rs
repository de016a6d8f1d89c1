use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{LandingPage, MessageList, Settings, TitleBar};

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    let input_height = tui.input_box.calculate_height(frame.area().width);
    let layout = Layout::vertical([Length(1), Min(0), Length(input_height)]);
    let [title_area, main_area, input_area] = layout.areas(frame.area());

    let config = app.panel.config();
    let mut title_bar = TitleBar::new(
        format!("{} / {}", config.provider, config.model),
        app.session.connection_state(),
        app.status_message.clone(),
        app.banner(),
        tui.message_list.has_unseen_content,
    );
    title_bar.render(frame, title_area);

    if app.has_messages() {
        let copied = tui.visible_acks(app, Instant::now());
        MessageList::new(
            &mut tui.message_list,
            app.session.transcript(),
            &copied,
            app.session.is_pending(),
            spinner_frame,
        )
        .render(frame, main_area);
    } else {
        LandingPage::new(&tui.landing, app.session.connection_state().label()).render(frame, main_area);
    }

    tui.input_box.title = config.summary();
    tui.input_box.waiting = app.session.is_pending();
    tui.input_box.render(frame, input_area);

    if let Some(settings) = &tui.settings {
        Settings::new(settings, config).render(frame, frame.area());
    }
}
