//! Interactive quiz over stdin/stdout.
//!
//! Ticks and typed answers are raced with `tokio::select!`; whichever arrives
//! first is fed into the session. Closing stdin abandons the quiz unsaved.

use quiz_core::model::{Attempt, Question, QuestionKind};
use services::{AppServices, QuizSession, QuizUpdate, SessionError, Step, TickTimer};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run_quiz(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let quiz = app.quiz_loop();
    if let Err(err) = quiz.initialize_store().await {
        eprintln!("warning: results will not be saved ({err})");
    }

    println!(
        "{} questions, {}s each. Type an answer (or an option number) and press Enter.",
        quiz.questions().len(),
        quiz.settings().time_limit_secs()
    );
    let mut session = quiz.start_session();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (timer, mut ticks) = TickTimer::every_second();
    print_question(&session);

    loop {
        tokio::select! {
            tick = ticks.recv() => {
                if tick.is_none() {
                    break;
                }
                let result = quiz.tick(&mut session).await;
                if report(result, &session, None)? {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!(answered = session.answers().len(), "quiz abandoned");
                    println!();
                    println!("Quiz abandoned; nothing was saved.");
                    break;
                };
                let Some(question) = session.current_question() else {
                    break;
                };
                let Some(answer) = resolve_answer(question, line.trim()) else {
                    println!("Please type an answer.");
                    continue;
                };
                let correct_answer = question.correct_answer().to_string();
                let shown = session.current_index();
                let result = quiz.submit_answer(&mut session, answer).await;
                if report(result, &session, Some(&correct_answer))? {
                    break;
                }
                if session.current_index() != shown {
                    // Full countdown for the next question.
                    timer.reset();
                    while ticks.try_recv().is_ok() {}
                }
            }
        }
    }

    timer.cancel();
    Ok(())
}

/// Turn typed input into answer text. Multiple-choice options may be picked by number.
fn resolve_answer(question: &Question, input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }
    if question.kind() == QuestionKind::MultipleChoice {
        if let Some(option) = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options().get(i))
        {
            return Some(option.clone());
        }
    }
    Some(input.to_string())
}

/// Print the outcome of one event. Returns `true` once the session is over.
fn report(
    result: Result<QuizUpdate, SessionError>,
    session: &QuizSession,
    correct_answer: Option<&str>,
) -> Result<bool, SessionError> {
    let update = match result {
        Ok(update) => update,
        Err(SessionError::Storage(err)) => {
            // The session is complete; only the save failed.
            eprintln!("warning: could not save this attempt ({err})");
            if let Some(attempt) = session.attempt() {
                print_summary(attempt);
            }
            return Ok(true);
        }
        Err(SessionError::Completed) => return Ok(true),
        Err(err) => return Err(err),
    };

    if let (Some(feedback), Some(answer)) = (update.feedback, correct_answer) {
        if feedback.correct {
            println!("Correct!");
        } else {
            println!("Incorrect. The answer was {answer}.");
        }
    }

    match &update.step {
        Step::Waiting { time_remaining } => {
            if *time_remaining <= 5 || time_remaining % 10 == 0 {
                println!("  {time_remaining}s left");
            }
        }
        Step::Advanced { .. } => {
            if correct_answer.is_none() {
                println!("Time's up!");
            }
            print_question(session);
        }
        Step::Completed(attempt) => {
            if correct_answer.is_none() {
                println!("Time's up!");
            }
            print_summary(attempt);
            if let Some(id) = update.saved_attempt_id {
                println!("Saved as {id}.");
            }
        }
        Step::Finished => {}
    }

    Ok(update.is_complete)
}

fn print_question(session: &QuizSession) {
    let progress = session.progress();
    let Some(question) = session.current_question() else {
        return;
    };
    println!();
    println!(
        "Question {}/{} ({}s): {}",
        progress.position(),
        progress.total,
        progress.time_remaining,
        question.prompt()
    );
    for (n, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", n + 1);
    }
}

fn print_summary(attempt: &Attempt) {
    println!();
    println!(
        "Quiz complete: {}/{} ({}%)",
        attempt.score(),
        attempt.total_questions(),
        attempt.percentage()
    );
}
