//! Terminal client for ranked QuizDuel matches.
//!
//! Reads its settings from `QUIZDUEL_*` environment variables and the
//! bearer token from `QUIZDUEL_TOKEN`. Answer by typing the option number;
//! `q` leaves the match.

use quizduel::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<(), QuizDuelError> {
    quizduel::init_tracing();

    let config = ClientConfig::from_env()?;
    let client = DuelClient::connect(config, &EnvCredentials::default()).await?;
    println!("Signed in as {}", client.local_player().username);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Searching for an opponent...");
        let pending = client.find_match().await?;
        match pending.outcome().await? {
            MatchOutcome::Found(game) => play(game, &mut input).await?,
            MatchOutcome::TimedOut => println!("Nobody is around right now."),
            MatchOutcome::Cancelled => println!("Search cancelled."),
        }

        println!("Play again? [y/N]");
        match input.next_line().await {
            Ok(Some(line)) if line.trim().eq_ignore_ascii_case("y") => continue,
            _ => break,
        }
    }

    client.close().await;
    Ok(())
}

/// Runs one match until its update stream ends.
async fn play(mut game: MatchHandle, input: &mut Input) -> Result<(), QuizDuelError> {
    let mut prompt: Option<QuestionPrompt> = None;
    let mut stdin_open = true;

    loop {
        tokio::select! {
            update = game.next_update() => {
                let Some(update) = update else {
                    return Ok(());
                };
                show(&update, &mut prompt);
            }
            line = input.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => act(&game, prompt.as_ref(), line.trim()).await?,
                    _ => {
                        stdin_open = false;
                        tracing::info!("input closed, leaving match");
                        let _ = game.abandon().await;
                    }
                }
            }
        }
    }
}

async fn act(
    game: &MatchHandle,
    prompt: Option<&QuestionPrompt>,
    line: &str,
) -> Result<(), QuizDuelError> {
    let sent = if line.eq_ignore_ascii_case("q") {
        game.abandon().await
    } else {
        answer(game, prompt, line).await
    };
    match sent {
        Err(QuizDuelError::Session(e)) => {
            println!("Not sent: {e}");
            Ok(())
        }
        other => other,
    }
}

async fn answer(
    game: &MatchHandle,
    prompt: Option<&QuestionPrompt>,
    line: &str,
) -> Result<(), QuizDuelError> {
    let Some(prompt) = prompt else {
        println!("No question yet.");
        return Ok(());
    };
    let choice = line
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| prompt.options.get(i));
    let Some(choice) = choice else {
        println!("Type a number between 1 and {}.", prompt.options.len());
        return Ok(());
    };
    game.submit_answer(choice.clone()).await
}

fn show(update: &SessionUpdate, prompt: &mut Option<QuestionPrompt>) {
    match update {
        SessionUpdate::QuestionOpened(next) => {
            println!();
            println!("Q{} [{}] {}", next.order + 1, next.category, next.text);
            for (i, option) in next.options.iter().enumerate() {
                println!("  {}) {option}", i + 1);
            }
            *prompt = Some(next.clone());
        }
        SessionUpdate::OptionsUnreadable { .. } => {
            println!("  (the choices for this question could not be read)");
        }
        SessionUpdate::QuestionCountdown { remaining } => {
            if *remaining <= 5 {
                println!("  {remaining}s left");
            }
        }
        SessionUpdate::QuestionTimeUp { .. } => println!("  Time is up."),
        SessionUpdate::AnswerLocked { answer, .. } => println!("  You answered {answer}."),
        SessionUpdate::AnswerRevealed { correct_answer, .. } => {
            println!("  Correct answer: {correct_answer}");
        }
        SessionUpdate::Feedback { player, correct } => {
            let who = match player {
                Player::Local => "You",
                Player::Opponent => "Opponent",
            };
            let verdict = if *correct { "right" } else { "wrong" };
            println!("  {who}: {verdict}");
        }
        SessionUpdate::ScoresChanged(Scoreboard { local, opponent }) => {
            println!("  Score {local} - {opponent}");
        }
        SessionUpdate::OpponentDisconnected { grace_secs } => {
            println!("  Opponent disconnected, waiting {grace_secs}s...");
        }
        SessionUpdate::OpponentGraceCountdown { .. }
        | SessionUpdate::ConnectionGraceCountdown { .. } => {}
        SessionUpdate::OpponentReconnected => println!("  Opponent is back."),
        SessionUpdate::OpponentUnreachable => println!("  Opponent has not come back."),
        SessionUpdate::ConnectionLost { grace_secs } => {
            println!("  Connection lost. The match is abandoned in {grace_secs}s.");
        }
        SessionUpdate::ConnectionRestored => println!("  Connection restored."),
        SessionUpdate::OpponentProfile(profile) => {
            println!("Playing against {}", profile.username);
        }
        SessionUpdate::Ended(Ending::Finished(result)) => {
            let headline = match result.outcome {
                Outcome::Won => "You win!",
                Outcome::Lost => "You lose.",
                Outcome::Draw => "Draw.",
            };
            println!();
            println!(
                "{headline} Final score {} - {}",
                result.scores.local, result.scores.opponent
            );
        }
        SessionUpdate::Ended(Ending::Abandoned(reason)) => {
            let why = match reason {
                AbandonReason::Local => "you left",
                AbandonReason::ConnectionLost => "the connection did not come back",
            };
            println!("Match abandoned: {why}.");
        }
    }
}
