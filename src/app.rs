//! Application controller: owns the lesson state and every collaborator,
//! turns key presses into lesson events and carries out the effects that
//! come back.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, error};

use crate::analyzer::worker::AnalysisPort;
use crate::analyzer::SIMULATE_ERROR;
use crate::book::Catalog;
use crate::config::Config;
use crate::game_loop::{GameError, GameLoop};
use crate::input::KeyTracker;
use crate::lesson::{transition, Effect, LessonEvent, LessonState, Page, ReaderPhase};
use crate::physics::{Course, FrameOutcome};
use crate::scheduler::{DelayedTasks, TimerTask};

/// Frames run per pump before overdue ones are dropped.
const MAX_CATCH_UP_FRAMES: usize = 5;

/// How often a pending analysis is polled for its result.
pub const ANALYSIS_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppSettings {
    pub starting_lives: u32,
    pub quiz_feedback_delay: Duration,
    pub frame_interval: Duration,
    pub key_hold: Duration,
    /// Whether the terminal sends key release events.
    pub reports_release: bool,
}

impl AppSettings {
    pub fn from_config(config: &Config, reports_release: bool) -> Self {
        Self {
            starting_lives: config.starting_lives,
            quiz_feedback_delay: config.quiz_feedback_delay(),
            frame_interval: config.frame_interval(),
            key_hold: config.key_hold(),
            reports_release,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&Config::default(), false)
    }
}

pub struct App {
    catalog: Catalog,
    state: LessonState,
    analysis: Box<dyn AnalysisPort>,
    timers: DelayedTasks,
    game: GameLoop,
    keys: KeyTracker,
    quiz_delay: Duration,
    offline: bool,
    library_cursor: usize,
    reading_input: String,
    should_quit: bool,
}

impl App {
    pub fn new(catalog: Catalog, analysis: Box<dyn AnalysisPort>, settings: AppSettings) -> Self {
        Self::with_course(catalog, analysis, settings, Course::standard())
    }

    pub fn with_course(
        catalog: Catalog,
        analysis: Box<dyn AnalysisPort>,
        settings: AppSettings,
        course: Course,
    ) -> Self {
        Self {
            catalog,
            state: LessonState::new(settings.starting_lives),
            analysis,
            timers: DelayedTasks::new(),
            game: GameLoop::new(course, settings.frame_interval),
            keys: KeyTracker::new(settings.key_hold, settings.reports_release),
            quiz_delay: settings.quiz_feedback_delay,
            offline: false,
            library_cursor: 0,
            reading_input: String::new(),
            should_quit: false,
        }
    }

    /// Marks the session as running without the remote analyzer.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &LessonState {
        &self.state
    }

    pub fn game(&self) -> &GameLoop {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameLoop {
        &mut self.game
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn library_cursor(&self) -> usize {
        self.library_cursor
    }

    pub fn reading_input(&self) -> &str {
        &self.reading_input
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Feeds one event through the state machine and runs its effects.
    pub fn dispatch(&mut self, event: LessonEvent, now: Instant) -> Result<(), GameError> {
        let (next, effects) = transition(&self.state, event, &self.catalog);
        self.state = next;
        for effect in effects {
            self.apply(effect, now)?;
        }
        Ok(())
    }

    fn apply(&mut self, effect: Effect, now: Instant) -> Result<(), GameError> {
        debug!(?effect, "applying effect");
        match effect {
            Effect::RequestAnalysis(job) => self.analysis.submit(job),
            Effect::CancelAnalysis(ticket) => self.analysis.cancel(ticket),
            Effect::ScheduleQuizAdvance => self.timers.schedule(
                Page::Quiz,
                now,
                self.quiz_delay,
                TimerTask::AdvanceQuestion,
            ),
            Effect::CancelPageTimers(page) => {
                let dropped = self.timers.cancel_page(page);
                debug!(%page, dropped, "page timers cancelled");
            }
            Effect::StartGameLoop => {
                self.keys.clear();
                if let Err(err) = self.game.start(now) {
                    error!(%err, "cannot start the game loop");
                    return Err(err);
                }
            }
            Effect::StopGameLoop => {
                self.game.stop();
                self.keys.clear();
            }
            Effect::RespawnActor => self.game.respawn(),
        }
        Ok(())
    }

    /// Earliest instant at which `pump` has work to do, if any.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let analysis = self.state.is_analyzing().then(|| now + ANALYSIS_POLL);
        [self.timers.next_due(), self.game.next_frame_due(), analysis]
            .into_iter()
            .flatten()
            .min()
    }

    /// Collects finished analyses, fires due timers and runs due frames.
    /// Returns true when anything changed that needs a redraw.
    pub fn pump(&mut self, now: Instant) -> Result<bool, GameError> {
        let mut changed = false;

        while let Some(outcome) = self.analysis.poll() {
            let event = LessonEvent::AnalysisResolved {
                ticket: outcome.ticket,
                verdict: outcome.analysis.into_verdict(),
            };
            self.dispatch(event, now)?;
            changed = true;
        }

        for task in self.timers.take_due(now) {
            match task {
                TimerTask::AdvanceQuestion => self.dispatch(LessonEvent::QuizAdvanceDue, now)?,
            }
            changed = true;
        }

        let mut frames = 0;
        while frames < MAX_CATCH_UP_FRAMES {
            let input = self.keys.snapshot(now);
            match self.game.next_frame(now, input) {
                None => break,
                Some(FrameOutcome::Continue) => {}
                // The fall is settled before another frame can run.
                Some(FrameOutcome::Fell) => self.dispatch(LessonEvent::ActorFell, now)?,
            }
            frames += 1;
            changed = true;
        }
        if frames == MAX_CATCH_UP_FRAMES {
            self.game.skip_missed(now);
        }

        Ok(changed)
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Result<(), GameError> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit(now)?;
            return Ok(());
        }

        if self.state.page() == Page::Game {
            return self.on_game_key(key, now);
        }
        if key.kind == KeyEventKind::Release {
            return Ok(());
        }

        match self.state.page() {
            Page::Home => match key.code {
                KeyCode::Enter | KeyCode::Char('l') => {
                    self.dispatch(LessonEvent::OpenLibrary, now)?
                }
                KeyCode::Esc | KeyCode::Char('q') => self.quit(now)?,
                _ => {}
            },
            Page::Library => self.on_library_key(key, now)?,
            Page::Reader => self.on_reader_key(key, now)?,
            Page::Quiz => match key.code {
                KeyCode::Char(c @ '1'..='9') => {
                    let choice = c as usize - '1' as usize;
                    self.dispatch(LessonEvent::AnswerSelected(choice), now)?
                }
                KeyCode::Esc => self.dispatch(LessonEvent::Abandon, now)?,
                _ => {}
            },
            Page::Game => {}
        }
        Ok(())
    }

    fn on_library_key(&mut self, key: KeyEvent, now: Instant) -> Result<(), GameError> {
        let count = self.catalog.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.library_cursor = self.library_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.library_cursor + 1 < count {
                    self.library_cursor += 1;
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < count {
                    self.library_cursor = index;
                    self.open_book_at_cursor(now)?;
                }
            }
            KeyCode::Enter => self.open_book_at_cursor(now)?,
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                self.dispatch(LessonEvent::Back, now)?
            }
            _ => {}
        }
        Ok(())
    }

    fn open_book_at_cursor(&mut self, now: Instant) -> Result<(), GameError> {
        let Some(book) = self.catalog.books().get(self.library_cursor) else {
            return Ok(());
        };
        let id = book.id.clone();
        self.reading_input.clear();
        self.dispatch(LessonEvent::SelectBook(id), now)
    }

    fn on_reader_key(&mut self, key: KeyEvent, now: Instant) -> Result<(), GameError> {
        match self.state.reader() {
            ReaderPhase::Feedback(_) => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                    self.dispatch(LessonEvent::DismissFeedback, now)?;
                }
            }
            ReaderPhase::Analyzing(_) => {
                if key.code == KeyCode::Esc {
                    self.dispatch(LessonEvent::Abandon, now)?;
                }
            }
            ReaderPhase::Idle => match key.code {
                KeyCode::Char(c) => self.reading_input.push(c),
                KeyCode::Backspace => {
                    self.reading_input.pop();
                }
                KeyCode::Enter => {
                    // An empty attempt reads the line exactly as written.
                    let spoken = if self.reading_input.trim().is_empty() {
                        self.state
                            .current_line(&self.catalog)
                            .unwrap_or_default()
                            .to_string()
                    } else {
                        self.reading_input.trim().to_string()
                    };
                    self.submit_reading(spoken, now)?;
                }
                KeyCode::Tab => self.submit_reading(SIMULATE_ERROR.to_string(), now)?,
                KeyCode::Esc => self.dispatch(LessonEvent::Abandon, now)?,
                _ => {}
            },
        }
        Ok(())
    }

    fn submit_reading(&mut self, spoken: String, now: Instant) -> Result<(), GameError> {
        self.reading_input.clear();
        self.dispatch(LessonEvent::SubmitReading { spoken }, now)
    }

    fn on_game_key(&mut self, key: KeyEvent, now: Instant) -> Result<(), GameError> {
        if self.keys.on_key_event(&key, now) {
            return Ok(());
        }
        if key.kind == KeyEventKind::Press
            && matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))
        {
            self.dispatch(LessonEvent::QuitGame, now)?;
        }
        Ok(())
    }

    /// Leaves through the state machine first so running work is cancelled.
    fn quit(&mut self, now: Instant) -> Result<(), GameError> {
        let exit = match self.state.page() {
            Page::Reader | Page::Quiz => Some(LessonEvent::Abandon),
            Page::Game => Some(LessonEvent::QuitGame),
            Page::Home | Page::Library => None,
        };
        if let Some(event) = exit {
            self.dispatch(event, now)?;
        }
        self.should_quit = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::worker::InlineAnalysis;
    use crate::analyzer::{Analyzer, Offline};
    use crate::book::BookId;
    use crate::lesson::QuizPhase;
    use rand::{rngs::StdRng, SeedableRng};

    fn app() -> App {
        let analysis = InlineAnalysis::new(Analyzer::with_rng(Offline, StdRng::seed_from_u64(7)));
        App::new(
            Catalog::bundled().unwrap(),
            Box::new(analysis),
            AppSettings::default(),
        )
        .offline(true)
    }

    fn press(app: &mut App, code: KeyCode, now: Instant) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE), now).unwrap();
    }

    fn open_book(app: &mut App, digit: char, now: Instant) {
        press(app, KeyCode::Enter, now);
        press(app, KeyCode::Char(digit), now);
        assert_eq!(app.state().page(), Page::Reader);
    }

    #[test]
    fn test_home_to_library_and_back() {
        let now = Instant::now();
        let mut app = app();
        press(&mut app, KeyCode::Char('l'), now);
        assert_eq!(app.state().page(), Page::Library);
        press(&mut app, KeyCode::Esc, now);
        assert_eq!(app.state().page(), Page::Home);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_library_cursor_bounds() {
        let now = Instant::now();
        let mut app = app();
        press(&mut app, KeyCode::Enter, now);
        press(&mut app, KeyCode::Up, now);
        assert_eq!(app.library_cursor(), 0);
        for _ in 0..10 {
            press(&mut app, KeyCode::Down, now);
        }
        assert_eq!(app.library_cursor(), app.catalog().len() - 1);

        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.state().active_book_id(), Some(&BookId::from("book3")));
    }

    #[test]
    fn test_empty_attempt_reads_line_and_advances() {
        let now = Instant::now();
        let mut app = app();
        open_book(&mut app, '1', now);

        press(&mut app, KeyCode::Enter, now);
        assert!(app.state().is_analyzing());

        assert!(app.pump(now).unwrap());
        assert_eq!(app.state().line_index(), 1);
        assert_eq!(app.state().reader(), &ReaderPhase::Idle);
    }

    #[test]
    fn test_typed_attempt_is_trimmed_and_cleared() {
        let now = Instant::now();
        let mut app = app();
        open_book(&mut app, '1', now);
        for c in " hi ".chars() {
            press(&mut app, KeyCode::Char(c), now);
        }
        press(&mut app, KeyCode::Backspace, now);
        assert_eq!(app.reading_input(), " hi");

        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.reading_input(), "");
        app.pump(now).unwrap();
        assert_eq!(app.state().line_index(), 1);
    }

    #[test]
    fn test_simulated_error_shows_feedback_until_dismissed() {
        let now = Instant::now();
        let mut app = app();
        open_book(&mut app, '1', now);

        press(&mut app, KeyCode::Tab, now);
        app.pump(now).unwrap();
        assert!(matches!(app.state().reader(), ReaderPhase::Feedback(_)));
        assert_eq!(app.state().line_index(), 0);

        // Typing is swallowed while the modal is up
        press(&mut app, KeyCode::Char('x'), now);
        assert_eq!(app.reading_input(), "");

        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.state().line_index(), 1);
    }

    #[test]
    fn test_abandon_reader_drops_inflight_analysis() {
        let now = Instant::now();
        let mut app = app();
        open_book(&mut app, '1', now);
        press(&mut app, KeyCode::Enter, now);
        press(&mut app, KeyCode::Esc, now);

        assert_eq!(app.state().page(), Page::Home);
        assert!(!app.pump(now).unwrap());
    }

    fn read_book(app: &mut App, digit: char, now: Instant) {
        open_book(app, digit, now);
        while app.state().page() == Page::Reader {
            press(app, KeyCode::Enter, now);
            app.pump(now).unwrap();
        }
    }

    #[test]
    fn test_quiz_advances_after_delay() {
        let t0 = Instant::now();
        let mut app = app();
        read_book(&mut app, '1', t0);
        assert_eq!(app.state().page(), Page::Quiz);

        press(&mut app, KeyCode::Char('2'), t0);
        assert!(matches!(app.state().quiz(), QuizPhase::Answered(_)));

        app.pump(t0 + Duration::from_millis(1999)).unwrap();
        assert_eq!(app.state().question_index(), 0);

        app.pump(t0 + Duration::from_millis(2000)).unwrap();
        assert_eq!(app.state().question_index(), 1);
        assert_eq!(app.state().quiz(), &QuizPhase::Asking);
    }

    #[test]
    fn test_leaving_quiz_cancels_pending_advance() {
        let t0 = Instant::now();
        let mut app = app();
        read_book(&mut app, '1', t0);
        press(&mut app, KeyCode::Char('1'), t0);
        assert_eq!(app.pending_timers(), 1);

        press(&mut app, KeyCode::Esc, t0);
        assert_eq!(app.state().page(), Page::Home);
        assert_eq!(app.pending_timers(), 0);
        assert!(!app.pump(t0 + Duration::from_secs(5)).unwrap());
    }

    fn reach_game(app: &mut App, t0: Instant) -> Instant {
        read_book(app, '2', t0);
        let mut now = t0;
        while app.state().page() == Page::Quiz {
            press(app, KeyCode::Char('1'), now);
            now += Duration::from_secs(2);
            app.pump(now).unwrap();
        }
        now
    }

    #[test]
    fn test_next_deadline_follows_scheduled_work() {
        let t0 = Instant::now();
        let mut app = app();
        assert_eq!(app.next_deadline(t0), None);

        open_book(&mut app, '1', t0);
        assert_eq!(app.next_deadline(t0), None);
        press(&mut app, KeyCode::Enter, t0);
        assert_eq!(app.next_deadline(t0), Some(t0 + ANALYSIS_POLL));
        app.pump(t0).unwrap();
        assert_eq!(app.next_deadline(t0), None);

        while app.state().page() == Page::Reader {
            press(&mut app, KeyCode::Enter, t0);
            app.pump(t0).unwrap();
        }
        press(&mut app, KeyCode::Char('1'), t0);
        assert_eq!(app.next_deadline(t0), Some(t0 + Duration::from_secs(2)));

        let now = t0 + Duration::from_secs(2);
        app.pump(now).unwrap();
        assert_eq!(app.next_deadline(now), None);
    }

    #[test]
    fn test_next_deadline_is_next_frame_while_playing() {
        let t0 = Instant::now();
        let mut app = app();
        let now = reach_game(&mut app, t0);
        let frame = app.game().frame_interval();
        assert_eq!(app.next_deadline(now), Some(now + frame));

        press(&mut app, KeyCode::Char('q'), now);
        assert_eq!(app.next_deadline(now), None);
    }

    #[test]
    fn test_finishing_book_starts_game_with_reward() {
        let t0 = Instant::now();
        let mut app = app();
        reach_game(&mut app, t0);

        assert_eq!(app.state().page(), Page::Game);
        assert_eq!(app.state().lives(), 2);
        assert!(app.game().is_running());
    }

    #[test]
    fn test_quit_game_stops_loop() {
        let t0 = Instant::now();
        let mut app = app();
        let now = reach_game(&mut app, t0);

        press(&mut app, KeyCode::Char('q'), now);
        assert_eq!(app.state().page(), Page::Home);
        assert!(!app.game().is_running());
    }

    #[test]
    fn test_fall_costs_life_then_depletion_goes_home() {
        let t0 = Instant::now();
        let mut app = app();
        let mut now = reach_game(&mut app, t0);
        let frame = app.game().frame_interval();

        app.game_mut().world_mut().actor.y = 700.0;
        now += frame;
        app.pump(now).unwrap();
        assert_eq!(app.state().lives(), 1);
        assert_eq!(app.state().page(), Page::Game);
        assert!(app.game().world().actor.y < 100.0);

        app.game_mut().world_mut().actor.y = 700.0;
        now += frame;
        app.pump(now).unwrap();
        assert_eq!(app.state().lives(), 0);
        assert_eq!(app.state().page(), Page::Home);
        assert!(!app.game().is_running());
    }

    #[test]
    fn test_game_keys_move_actor() {
        let t0 = Instant::now();
        let mut app = app();
        let mut now = reach_game(&mut app, t0);
        let frame = app.game().frame_interval();
        let start_x = app.game().world().actor.x;

        for _ in 0..3 {
            press(&mut app, KeyCode::Char('d'), now);
            now += frame;
            app.pump(now).unwrap();
        }
        assert!(app.game().world().actor.x > start_x);
    }

    #[test]
    fn test_catch_up_is_capped() {
        let t0 = Instant::now();
        let mut app = app();
        let now = reach_game(&mut app, t0);
        let before = app.game().frames();

        app.pump(now + Duration::from_secs(10)).unwrap();
        assert_eq!(app.game().frames() - before, MAX_CATCH_UP_FRAMES as u64);
    }

    #[test]
    fn test_ctrl_c_quits_from_anywhere() {
        let t0 = Instant::now();
        let mut app = app();
        let now = reach_game(&mut app, t0);

        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now)
            .unwrap();
        assert!(app.should_quit());
        assert!(!app.game().is_running());
    }

    #[test]
    fn test_missing_surface_is_reported() {
        let t0 = Instant::now();
        let analysis = InlineAnalysis::new(Analyzer::with_rng(Offline, StdRng::seed_from_u64(7)));
        let course = Course {
            height: 0.0,
            ..Course::standard()
        };
        let mut app = App::with_course(
            Catalog::bundled().unwrap(),
            Box::new(analysis),
            AppSettings::default(),
            course,
        );
        read_book(&mut app, '2', t0);
        press(&mut app, KeyCode::Char('1'), t0);

        let result = app.pump(t0 + Duration::from_secs(2));
        assert!(result.is_ok());
        press(&mut app, KeyCode::Char('1'), t0 + Duration::from_secs(2));
        let result = app.pump(t0 + Duration::from_secs(4));
        assert!(matches!(result, Err(GameError::MissingSurface { .. })));
    }
}
