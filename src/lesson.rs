//! Page flow of a reading session.
//!
//! [`transition`] is a pure function from the current [`LessonState`] and one
//! [`LessonEvent`] to the next state plus the [`Effect`]s the controller has
//! to carry out. Nothing here touches the network, timers or the game loop.

use tracing::{debug, info};

use crate::analyzer::worker::AnalysisJob;
use crate::analyzer::{Miscue, MiscueVerdict, Ticket};
use crate::book::{Book, BookId, Catalog, QuizItem};
use crate::ledger::{Debit, LivesLedger, FALL_PENALTY, QUIZ_REWARD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Page {
    Home,
    Library,
    Reader,
    Quiz,
    Game,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderPhase {
    Idle,
    /// Waiting on an analysis; further submissions are ignored.
    Analyzing(Ticket),
    /// Showing a miscue until the reader dismisses it.
    Feedback(Miscue),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizFeedback {
    pub selected: String,
    pub correct_answer: String,
    pub correct: bool,
}

impl QuizFeedback {
    pub fn message(&self) -> String {
        if self.correct {
            "Great job! That's correct!".to_string()
        } else {
            format!("Not quite. The correct answer was \"{}\".", self.correct_answer)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizPhase {
    Asking,
    /// Answer shown; the next question follows when the delay expires.
    Answered(QuizFeedback),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonState {
    page: Page,
    lives: LivesLedger,
    active_book: Option<BookId>,
    line_index: usize,
    question_index: usize,
    reader: ReaderPhase,
    quiz: QuizPhase,
    next_ticket: u64,
}

impl LessonState {
    pub fn new(lives: u32) -> Self {
        Self {
            page: Page::Home,
            lives: LivesLedger::new(lives),
            active_book: None,
            line_index: 0,
            question_index: 0,
            reader: ReaderPhase::Idle,
            quiz: QuizPhase::Asking,
            next_ticket: 1,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn lives(&self) -> u32 {
        self.lives.lives()
    }

    pub fn active_book_id(&self) -> Option<&BookId> {
        self.active_book.as_ref()
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn reader(&self) -> &ReaderPhase {
        &self.reader
    }

    pub fn quiz(&self) -> &QuizPhase {
        &self.quiz
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.reader, ReaderPhase::Analyzing(_))
    }

    pub fn active_book<'a>(&self, catalog: &'a Catalog) -> Option<&'a Book> {
        self.active_book.as_ref().and_then(|id| catalog.get(id))
    }

    pub fn current_line<'a>(&self, catalog: &'a Catalog) -> Option<&'a str> {
        self.active_book(catalog)
            .and_then(|book| book.lines.get(self.line_index))
            .map(String::as_str)
    }

    pub fn current_question<'a>(&self, catalog: &'a Catalog) -> Option<&'a QuizItem> {
        self.active_book(catalog)
            .and_then(|book| book.comprehension.get(self.question_index))
    }
}

impl Default for LessonState {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonEvent {
    OpenLibrary,
    Back,
    SelectBook(BookId),
    SubmitReading { spoken: String },
    AnalysisResolved { ticket: Ticket, verdict: MiscueVerdict },
    DismissFeedback,
    AnswerSelected(usize),
    QuizAdvanceDue,
    ActorFell,
    QuitGame,
    /// Leave the current book from the Reader or Quiz page.
    Abandon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RequestAnalysis(AnalysisJob),
    CancelAnalysis(Ticket),
    ScheduleQuizAdvance,
    CancelPageTimers(Page),
    StartGameLoop,
    StopGameLoop,
    RespawnActor,
}

pub fn transition(
    state: &LessonState,
    event: LessonEvent,
    catalog: &Catalog,
) -> (LessonState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match (state.page, event) {
        (Page::Home, LessonEvent::OpenLibrary) => next.page = Page::Library,
        (Page::Library, LessonEvent::Back) => next.page = Page::Home,
        (Page::Library, LessonEvent::SelectBook(id)) => {
            if catalog.get(&id).is_some() {
                next.active_book = Some(id);
                next.line_index = 0;
                next.reader = ReaderPhase::Idle;
                next.page = Page::Reader;
            } else {
                debug!(book = %id, "unknown book selected");
            }
        }
        (Page::Reader, LessonEvent::SubmitReading { spoken }) => {
            if let (ReaderPhase::Idle, Some(line)) = (&state.reader, state.current_line(catalog)) {
                let ticket = Ticket(next.next_ticket);
                next.next_ticket += 1;
                next.reader = ReaderPhase::Analyzing(ticket);
                effects.push(Effect::RequestAnalysis(AnalysisJob {
                    ticket,
                    spoken,
                    reference: line.to_string(),
                }));
            }
        }
        (Page::Reader, LessonEvent::AnalysisResolved { ticket, verdict }) => {
            if state.reader == ReaderPhase::Analyzing(ticket) {
                match verdict {
                    MiscueVerdict::Correct => advance_line(&mut next, catalog),
                    MiscueVerdict::Miscue(miscue) => next.reader = ReaderPhase::Feedback(miscue),
                }
            } else {
                debug!(%ticket, "dropping stale verdict");
            }
        }
        (Page::Reader, LessonEvent::DismissFeedback) => {
            if matches!(state.reader, ReaderPhase::Feedback(_)) {
                advance_line(&mut next, catalog);
            }
        }
        (Page::Quiz, LessonEvent::AnswerSelected(choice)) => {
            let question = state.current_question(catalog);
            if let (QuizPhase::Asking, Some(question)) = (&state.quiz, question) {
                if let Some(selected) = question.options.get(choice) {
                    next.quiz = QuizPhase::Answered(QuizFeedback {
                        selected: selected.clone(),
                        correct_answer: question.correct_answer.clone(),
                        correct: question.is_correct(selected),
                    });
                    effects.push(Effect::ScheduleQuizAdvance);
                }
            }
        }
        (Page::Quiz, LessonEvent::QuizAdvanceDue) => {
            if matches!(state.quiz, QuizPhase::Answered(_)) {
                next.question_index += 1;
                next.quiz = QuizPhase::Asking;
                finish_quiz_if_done(&mut next, catalog);
            }
        }
        (Page::Game, LessonEvent::ActorFell) => match next.lives.debit(FALL_PENALTY) {
            Debit::Depleted => {
                info!("out of lives");
                next.page = Page::Home;
            }
            Debit::Remaining(lives) => {
                info!(lives, "fell, respawning");
                effects.push(Effect::RespawnActor);
            }
        },
        (Page::Game, LessonEvent::QuitGame) => next.page = Page::Home,
        (Page::Reader | Page::Quiz, LessonEvent::Abandon) => next.page = Page::Home,
        (page, event) => debug!(%page, ?event, "event ignored"),
    }

    if next.page != state.page {
        leave(state.page, &mut next, &mut effects);
        enter(next.page, &mut effects);
        info!(from = %state.page, to = %next.page, lives = next.lives(), "page change");
    }

    (next, effects)
}

fn advance_line(next: &mut LessonState, catalog: &Catalog) {
    next.line_index += 1;
    next.reader = ReaderPhase::Idle;

    let line_count = next.active_book(catalog).map_or(0, |b| b.lines.len());
    if next.line_index >= line_count {
        next.line_index = line_count;
        next.question_index = 0;
        next.quiz = QuizPhase::Asking;
        next.page = Page::Quiz;
        finish_quiz_if_done(next, catalog);
    }
}

fn finish_quiz_if_done(next: &mut LessonState, catalog: &Catalog) {
    let question_count = next
        .active_book(catalog)
        .map_or(0, |b| b.comprehension.len());
    if next.question_index >= question_count {
        next.question_index = question_count;
        let lives = next.lives.credit(QUIZ_REWARD);
        info!(lives, "book complete");
        next.page = Page::Game;
    }
}

fn leave(page: Page, next: &mut LessonState, effects: &mut Vec<Effect>) {
    match page {
        Page::Reader => {
            if let ReaderPhase::Analyzing(ticket) = next.reader {
                effects.push(Effect::CancelAnalysis(ticket));
            }
            next.reader = ReaderPhase::Idle;
        }
        Page::Quiz => {
            effects.push(Effect::CancelPageTimers(Page::Quiz));
            next.quiz = QuizPhase::Asking;
        }
        Page::Game => effects.push(Effect::StopGameLoop),
        Page::Home | Page::Library => {}
    }
}

fn enter(page: Page, effects: &mut Vec<Effect>) {
    if page == Page::Game {
        effects.push(Effect::StartGameLoop);
    }
}
