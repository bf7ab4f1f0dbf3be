use analyst_core::{Command, Dispatcher, Render, Session, SessionError};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, error};

use crate::input::{Input, parse_input};
use crate::output::{print_error, print_help, print_models, print_turn, print_warning};

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Dispatches a command, with a spinner while a network call may be in flight
async fn dispatch(
    dispatcher: &Dispatcher,
    session: &mut Session,
    command: Command,
) -> Result<Render, SessionError> {
    let waiting = match &command {
        Command::Submit(_) | Command::SubmitSuggestion => Some("Asking Cortex Analyst..."),
        Command::SubmitFeedback { .. } => Some("Sending feedback..."),
        _ => None,
    };
    let progress = waiting.map(spinner);
    let result = dispatcher.dispatch(session, command).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    result
}

/// Prints whatever a command produced
fn show(session: &Session, render: &Render) {
    match render {
        Render::AssistantTurn(index) => {
            if let Some(turn) = session.turns().get(*index) {
                print_turn(turn, session.is_feedback_submitted(*index));
            }
        }
        Render::Warning(warning) => print_warning(warning),
        Render::SuggestionSelected(text) => println!(
            "{} {} {}",
            "Selected:".yellow().bold(),
            text,
            "(press enter or /send to ask)".dimmed()
        ),
        Render::FeedbackRecorded(_) => println!("{}", "Thanks for the feedback.".green()),
        Render::Cleared => println!("{}", "Chat history cleared.".dimmed()),
        Render::ModelSelected { model, changed } => {
            if *changed {
                println!(
                    "{} {} {}",
                    "Using".dimmed(),
                    model.display_name().bold(),
                    "(chat history cleared)".dimmed()
                );
            } else {
                println!("{} {}", "Already using".dimmed(), model.display_name().bold());
            }
        }
    }
}

/// Runs a single query mode, sending one question and displaying the answer
pub async fn run_single_query(
    prompt: String,
    dispatcher: &Dispatcher,
    session: &mut Session,
) -> Result<()> {
    debug!("Running single query: {}", prompt);

    let render = dispatch(dispatcher, session, Command::Submit(prompt))
        .await
        .context("Failed to ask Cortex Analyst")?;
    show(session, &render);

    if let Render::Warning(warning) = render {
        error!("Question failed: {}", warning);
        anyhow::bail!("Cortex Analyst did not answer");
    }
    Ok(())
}

/// Turns one line of input into a command, or handles it locally.
///
/// Returns `None` when there is nothing to dispatch.
fn to_command(input: Input, dispatcher: &Dispatcher, session: &Session) -> Option<Command> {
    match input {
        Input::Question(text) => Some(Command::Submit(text)),
        Input::Empty => session
            .active_suggestion()
            .map(|_| Command::SubmitSuggestion),
        Input::Send => Some(Command::SubmitSuggestion),
        Input::Clear => Some(Command::ClearHistory),
        Input::Model(name) => Some(Command::SelectSemanticModel(name)),
        Input::Suggest(n) => {
            let suggestions = session.last_suggestions();
            match suggestions.get(n - 1) {
                Some(text) => Some(Command::SelectSuggestion(text.to_string())),
                None => {
                    print_error(&format!(
                        "No suggestion {} (the last answer offered {})",
                        n,
                        suggestions.len()
                    ));
                    None
                }
            }
        }
        Input::Feedback { positive, comment } => {
            match session
                .last_assistant_turn()
                .and_then(|(_, turn)| turn.request_id.clone())
            {
                Some(request_id) => Some(Command::SubmitFeedback {
                    request_id,
                    positive,
                    comment,
                }),
                None => {
                    print_error("There is no answer to rate yet");
                    None
                }
            }
        }
        Input::Help => {
            print_help();
            None
        }
        Input::Models => {
            print_models(dispatcher.registry(), Some(session.semantic_model()));
            None
        }
        Input::History => {
            if session.turns().is_empty() {
                println!("{}", "No messages yet.".dimmed());
            }
            for (index, turn) in session.turns().iter().enumerate() {
                print_turn(turn, session.is_feedback_submitted(index));
                println!();
            }
            for warning in session.warnings() {
                print_warning(warning);
            }
            None
        }
        Input::Invalid(reason) => {
            print_error(&reason);
            None
        }
        Input::Exit => None,
    }
}

/// Runs an interactive chat session
pub async fn run_interactive_chat(dispatcher: &Dispatcher, session: &mut Session) -> Result<()> {
    println!(
        "Chatting with Cortex Analyst about {}.",
        session.semantic_model().display_name().bold()
    );
    println!("Type /help for commands, 'exit' or 'quit' to end the session.");
    println!();

    loop {
        // Prompt for user input
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            // EOF
            println!();
            break;
        }

        let input = parse_input(&input);
        if input == Input::Exit {
            println!("Exiting chat session.");
            break;
        }

        let Some(command) = to_command(input, dispatcher, session) else {
            continue;
        };

        debug!("Dispatching {:?}", command);
        match dispatch(dispatcher, session, command).await {
            Ok(render) => show(session, &render),
            Err(e) => print_error(&e.to_string()),
        }

        println!(); // Add spacing between interactions
    }

    Ok(())
}
