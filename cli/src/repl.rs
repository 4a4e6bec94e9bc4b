use anyhow::Result;
use console::style;
use errand_core::agent::{AgentLoop, RunContext};
use errand_core::traits::Message;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

/// Interactive chat loop. The accumulated message sequence of each
/// successful run seeds the next one, so the conversation carries across
/// turns. Ctrl-C during a run cancels it without quitting the REPL.
pub async fn run(agent: AgentLoop, ctx: RunContext) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let history_path = errand_core::config::get_errand_dir().join("history.txt");
    let _ = editor.load_history(&history_path);

    println!("{}", style("errand").cyan().bold());
    println!("Type your message (Ctrl-D to exit):\n");

    let mut history: Vec<Message> = Vec::new();

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        let mut messages = history.clone();
        messages.push(Message::user(input));

        let token = CancellationToken::new();
        let run = agent.run_cancellable(messages, &ctx, token.clone());
        tokio::pin!(run);

        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                _ = tokio::signal::ctrl_c() => {
                    token.cancel();
                    eprintln!("{}", style("cancelling...").yellow());
                }
            }
        };

        match result {
            Ok(run) => {
                let reply = run.final_message.content.to_text_lossy();
                println!();
                termimad::print_text(&reply);
                println!();
                history = run.messages;
            }
            Err(failure) if failure.is_cancelled() => {
                eprintln!("{}", style("run cancelled").yellow());
            }
            Err(failure) => {
                eprintln!("{} {}", style("error:").red().bold(), failure);
            }
        }
    }

    let _ = errand_core::config::ensure_errand_dir();
    let _ = editor.save_history(&history_path);
    println!("\nGoodbye!");
    Ok(())
}
