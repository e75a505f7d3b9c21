use readbuddy::analyzer::{Miscue, MiscueVerdict, Ticket};
use readbuddy::book::{Book, Catalog};
use readbuddy::ledger::QUIZ_REWARD;
use readbuddy::lesson::{transition, Effect, LessonEvent, LessonState, Page, ReaderPhase};

fn step(state: &LessonState, event: LessonEvent, catalog: &Catalog) -> (LessonState, Vec<Effect>) {
    transition(state, event, catalog)
}

fn requested_ticket(effects: &[Effect]) -> Ticket {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::RequestAnalysis(job) => Some(job.ticket),
            _ => None,
        })
        .expect("submission should request an analysis")
}

fn miscue() -> MiscueVerdict {
    MiscueVerdict::Miscue(Miscue {
        expected_word: "fox".into(),
        spoken_word: "box".into(),
        phonetic_hint: "/f/ /o/ /x/".into(),
        feedback_script: "Try again: fox.".into(),
    })
}

/// Reads every line of `book`, with a miscue on every `miscue_every`th line
/// when set, checking the line invariants along the way.
fn read_book(
    book: &Book,
    catalog: &Catalog,
    lives: u32,
    miscue_every: Option<usize>,
) -> LessonState {
    let (state, _) = step(&LessonState::new(lives), LessonEvent::OpenLibrary, catalog);
    let (mut state, _) = step(&state, LessonEvent::SelectBook(book.id.clone()), catalog);
    assert_eq!(state.page(), Page::Reader);
    assert_eq!(state.line_index(), 0);

    for line in 0..book.lines.len() {
        assert_eq!(state.page(), Page::Reader);
        assert_eq!(state.line_index(), line);
        assert_eq!(state.current_line(catalog), Some(book.lines[line].as_str()));

        let (next, effects) = step(
            &state,
            LessonEvent::SubmitReading {
                spoken: book.lines[line].clone(),
            },
            catalog,
        );
        let ticket = requested_ticket(&effects);

        let wrong = miscue_every.is_some_and(|n| line % n == 0);
        let verdict = if wrong { miscue() } else { MiscueVerdict::Correct };
        let (next, _) = step(&next, LessonEvent::AnalysisResolved { ticket, verdict }, catalog);

        state = if wrong {
            assert_eq!(next.line_index(), line);
            assert!(matches!(next.reader(), ReaderPhase::Feedback(_)));
            step(&next, LessonEvent::DismissFeedback, catalog).0
        } else {
            next
        };
        assert!(state.line_index() <= book.lines.len());
    }
    state
}

fn answer_all(
    mut state: LessonState,
    book: &Book,
    catalog: &Catalog,
    pick_correct: bool,
) -> LessonState {
    for (idx, question) in book.comprehension.iter().enumerate() {
        assert_eq!(state.page(), Page::Quiz);
        assert_eq!(state.question_index(), idx);

        let choice = question
            .options
            .iter()
            .position(|o| question.is_correct(o) == pick_correct)
            .unwrap();
        let (answered, effects) = step(&state, LessonEvent::AnswerSelected(choice), catalog);
        assert_eq!(effects, vec![Effect::ScheduleQuizAdvance]);
        state = step(&answered, LessonEvent::QuizAdvanceDue, catalog).0;
        assert!(state.question_index() <= book.comprehension.len());
    }
    state
}

#[test]
fn every_book_reaches_game_with_reward() {
    let catalog = Catalog::bundled().unwrap();
    for book in catalog.books() {
        for lives in [0, 3] {
            let state = read_book(book, &catalog, lives, None);
            let state = answer_all(state, book, &catalog, true);

            assert_eq!(state.page(), Page::Game, "book {}", book.id);
            assert_eq!(state.lives(), lives + QUIZ_REWARD);
        }
    }
}

#[test]
fn miscues_never_skip_lines() {
    let catalog = Catalog::bundled().unwrap();
    for book in catalog.books() {
        let state = read_book(book, &catalog, 0, Some(2));
        assert_eq!(state.page(), Page::Quiz);
        assert_eq!(state.line_index(), book.lines.len());
    }
}

#[test]
fn wrong_answers_still_advance_and_reward() {
    let catalog = Catalog::bundled().unwrap();
    for book in catalog.books() {
        let state = read_book(book, &catalog, 0, None);
        let state = answer_all(state, book, &catalog, false);
        assert_eq!(state.page(), Page::Game);
        assert_eq!(state.lives(), QUIZ_REWARD);
    }
}

#[test]
fn game_entry_and_exit_pair_up() {
    let catalog = Catalog::bundled().unwrap();
    let book = &catalog.books()[0];
    let state = read_book(book, &catalog, 0, None);

    // The final advance carries the start effect
    let mut state = state;
    let mut start_effects = 0;
    for (idx, _) in book.comprehension.iter().enumerate() {
        let (answered, _) = step(&state, LessonEvent::AnswerSelected(0), &catalog);
        let (next, effects) = step(&answered, LessonEvent::QuizAdvanceDue, &catalog);
        start_effects += effects.iter().filter(|e| **e == Effect::StartGameLoop).count();
        if idx + 1 < book.comprehension.len() {
            assert!(effects.is_empty());
        }
        state = next;
    }
    assert_eq!(start_effects, 1);

    let (home, effects) = step(&state, LessonEvent::QuitGame, &catalog);
    assert_eq!(home.page(), Page::Home);
    assert_eq!(effects, vec![Effect::StopGameLoop]);
}

#[test]
fn lives_run_out_after_reward_many_falls() {
    let catalog = Catalog::bundled().unwrap();
    let book = &catalog.books()[1];
    let state = answer_all(read_book(book, &catalog, 1, None), book, &catalog, true);
    let mut state = state;
    let total = state.lives();

    for fall in 1..=total {
        let (next, effects) = step(&state, LessonEvent::ActorFell, &catalog);
        if fall < total {
            assert_eq!(next.page(), Page::Game);
            assert_eq!(effects, vec![Effect::RespawnActor]);
        } else {
            assert_eq!(next.page(), Page::Home);
            assert_eq!(effects, vec![Effect::StopGameLoop]);
        }
        assert_eq!(next.lives(), total - fall);
        state = next;
    }
}

#[test]
fn stale_results_change_nothing() {
    let catalog = Catalog::bundled().unwrap();
    let book = &catalog.books()[0];
    let (state, _) = step(&LessonState::new(0), LessonEvent::OpenLibrary, &catalog);
    let (state, _) = step(&state, LessonEvent::SelectBook(book.id.clone()), &catalog);
    let (pending, effects) = step(
        &state,
        LessonEvent::SubmitReading {
            spoken: "x".into(),
        },
        &catalog,
    );
    let ticket = requested_ticket(&effects);

    let stale = LessonEvent::AnalysisResolved {
        ticket: Ticket(ticket.0 + 100),
        verdict: MiscueVerdict::Correct,
    };
    let (after, effects) = step(&pending, stale, &catalog);
    assert_eq!(after, pending);
    assert!(effects.is_empty());

    let (after, effects) = step(&pending, LessonEvent::QuizAdvanceDue, &catalog);
    assert_eq!(after, pending);
    assert!(effects.is_empty());
}
