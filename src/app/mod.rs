use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::api::BrainApi;
use crate::auth::AuthContext;
use crate::config::AppConfig;
use crate::content::{Job, SubmissionRunner};
use crate::ui;

pub mod state;

pub use state::{AppState, Effect, NoteField, Screen};

pub struct App {
    pub config: Arc<AppConfig>,
    state: AppState,
    content_runner: SubmissionRunner,
    image_runner: SubmissionRunner,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, auth: &AuthContext, api: Arc<dyn BrainApi>) -> Self {
        let mut state = AppState::new(
            config.notes.policy(),
            config.ui.toast_ttl(),
            auth.is_authenticated(),
        );
        if !auth.is_authenticated() {
            state.set_status_message(Some(
                "No session token: content uploads will fail until `brain token set` is run",
            ));
        }
        Self {
            tick_rate: config.ui.tick_rate(),
            config,
            state,
            content_runner: SubmissionRunner::new(Arc::clone(&api)),
            image_runner: SubmissionRunner::new(api),
            should_quit: false,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| ui::draw_app(frame, &self.state))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Paste(text) => self.state.handle_paste(&text),
                    Event::Resize(_, _) => {
                        // next draw picks up the new size
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.state.handle_key(key) {
            Effect::None => {}
            Effect::Quit => self.should_quit = true,
            Effect::Run(job) => self.dispatch(job),
        }
    }

    fn dispatch(&mut self, job: Job) {
        let runner = match job {
            Job::AddContent { .. } => &mut self.content_runner,
            Job::UploadImage { .. } => &mut self.image_runner,
        };
        if !runner.start(job) {
            tracing::warn!("request already in flight, ignoring");
        }
    }

    fn on_tick(&mut self) {
        for runner in [&mut self.content_runner, &mut self.image_runner] {
            if let Some(outcome) = runner.poll() {
                tracing::debug!(?outcome, "background request finished");
                self.state.apply_outcome(outcome);
            }
        }
        self.state.toasts.expire();
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("creating terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )
    .context("leaving alternate screen")?;
    terminal.show_cursor().context("showing cursor")?;
    Ok(())
}
