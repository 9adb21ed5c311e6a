//! The interactive chat loop.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use murmur_application::{ConversationOrchestrator, DeliveryDispatcher, spawn_auto_chat};
use murmur_core::turn::Turn;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::console::{COMMANDS, Console, Input};
use crate::render;
use crate::runtime::{self, GlobalOpts};

/// A cycle the user asked for.
enum Request {
    Reply(String),
    Discussion(String),
}

struct Session {
    orchestrator: Arc<ConversationOrchestrator>,
    dispatcher: DeliveryDispatcher,
    notices: mpsc::Sender<String>,
    shutdown: CancellationToken,
    /// Model the user was last told about
    shown_model: String,
}

impl Session {
    /// Runs a cycle in the background so the prompt stays responsive.
    fn start(&self, request: Request) {
        if self.orchestrator.is_busy() {
            let _ = self
                .notices
                .try_send(render::system_line("Still thinking; message dropped."));
            return;
        }

        let cancel = self.shutdown.child_token();
        let orchestrator = self.orchestrator.clone();
        let dispatcher = self.dispatcher.clone();
        let notices = self.notices.clone();

        tokio::spawn(async move {
            let result = match &request {
                Request::Reply(message) => orchestrator.respond(message, &cancel).await,
                Request::Discussion(topic) => {
                    let _ = notices
                        .send(render::system_line(&format!("📢 Discussion topic: {topic}")))
                        .await;
                    orchestrator.discuss(topic, &cancel).await
                }
            };

            match result {
                Ok(report) => {
                    if report.plan.is_empty() {
                        let _ = notices
                            .send(render::system_line("Nobody felt like answering."))
                            .await;
                    }
                    dispatcher.dispatch(report.plan);
                }
                Err(e) if e.is_busy() => {
                    let _ = notices
                        .send(render::system_line("Still thinking; message dropped."))
                        .await;
                }
                Err(e) => {
                    let _ = notices.send(render::error_line(&format!("Error: {e}"))).await;
                }
            }
        });
    }

    /// Cancels whichever cycle is running, prompted or automatic.
    fn interrupt(&self) -> String {
        if self.orchestrator.cancel_current() {
            render::system_line("Cancelling the current reply...")
        } else {
            render::system_line("Type /quit to exit.")
        }
    }

    fn model_notice(&mut self, turn: &Turn) -> Option<String> {
        model_notice(&mut self.shown_model, turn)
    }

    fn switched(&mut self, result: murmur_core::Result<String>) -> String {
        match result {
            Ok(model) => {
                let line = render::system_line(&format!("Model switched to {model}."));
                self.shown_model = model;
                line
            }
            Err(e) => render::error_line(&format!("Error: {e}")),
        }
    }

    async fn command(&mut self, line: &str) -> String {
        let (name, arg) = match line.split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match name {
            "/discuss" if !arg.is_empty() => {
                self.start(Request::Discussion(arg.to_string()));
                String::new()
            }
            "/discuss" => render::error_line("Usage: /discuss <topic>"),
            "/clear" => match self.orchestrator.clear_history().await {
                Ok(()) => render::system_line("History cleared."),
                Err(e) => render::error_line(&format!("Error: {e}")),
            },
            "/model" if arg.is_empty() => {
                let snapshot = self.orchestrator.snapshot();
                let errors: Vec<String> = snapshot
                    .error_counts
                    .iter()
                    .map(|(model, count)| format!("{model}: {count}"))
                    .collect();
                let mut text = format!(
                    "Model: {} (primary {})",
                    snapshot.active, snapshot.primary
                );
                if !errors.is_empty() {
                    text.push_str(&format!(", errors [{}]", errors.join(", ")));
                }
                if !snapshot.cooling_down.is_empty() {
                    text.push_str(&format!(
                        ", cooling down [{}]",
                        snapshot.cooling_down.join(", ")
                    ));
                }
                render::system_line(&text)
            }
            "/model" if arg == "reset" => {
                let model = self.orchestrator.reset_model();
                self.switched(Ok(model))
            }
            "/model" if arg == "recommended" => {
                let result = self.orchestrator.use_recommended_model();
                self.switched(result)
            }
            "/model" => {
                let result = self
                    .orchestrator
                    .set_model(arg)
                    .map(|()| arg.to_string());
                self.switched(result)
            }
            "/help" => render::system_line(&format!(
                "Commands: {}. Ctrl-C cancels a reply in progress.",
                COMMANDS.map(str::trim_end).join(", ")
            )),
            _ => render::error_line(&format!("Unknown command: {name}")),
        }
    }
}

/// A notice when turns start arriving from a model other than `shown`.
fn model_notice(shown: &mut String, turn: &Turn) -> Option<String> {
    let model = turn.model.as_deref()?;
    if model == shown.as_str() {
        return None;
    }
    *shown = model.to_string();
    Some(render::system_line(&format!(
        "Switched to {model} after the previous model failed."
    )))
}

pub async fn run(opts: &GlobalOpts) -> Result<()> {
    let orchestrator = runtime::build_orchestrator(opts).await?;
    let colors: HashMap<String, Option<String>> = orchestrator
        .registry()
        .iter()
        .map(|p| (p.id.clone(), p.color.clone()))
        .collect();

    let shutdown = CancellationToken::new();
    let (turn_tx, mut turns) = mpsc::channel::<Turn>(64);
    let (notice_tx, mut notices) = mpsc::channel::<String>(16);
    let dispatcher = DeliveryDispatcher::new(turn_tx).with_shutdown(shutdown.clone());
    let auto_chat = spawn_auto_chat(
        orchestrator.clone(),
        dispatcher.clone(),
        shutdown.child_token(),
    );

    let mut console = Console::start().await?;
    let names: Vec<&str> = orchestrator.registry().iter().map(|p| p.name.as_str()).collect();
    console.print(render::system_line(&format!(
        "{} are here. Mention someone by name to get their attention; /help lists commands.",
        names.join(", ")
    )));

    let mut session = Session {
        shown_model: orchestrator.active_model(),
        orchestrator,
        dispatcher,
        notices: notice_tx,
        shutdown: shutdown.clone(),
    };

    loop {
        tokio::select! {
            Some(turn) = turns.recv() => {
                if let Some(notice) = session.model_notice(&turn) {
                    console.print(notice);
                }
                let color = colors.get(&turn.persona_id).and_then(|c| c.as_deref());
                console.print(render::turn_line(&turn, color));
            }
            Some(notice) = notices.recv() => console.print(notice),
            input = console.next() => match input {
                Input::Quit => break,
                Input::Interrupt => {
                    let notice = session.interrupt();
                    console.print(notice);
                }
                Input::Line(line) if line.starts_with('/') => {
                    let reply = session.command(&line).await;
                    if !reply.is_empty() {
                        console.print(reply);
                    }
                }
                Input::Line(line) => session.start(Request::Reply(line)),
            },
        }
    }

    shutdown.cancel();
    let _ = auto_chat.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::interest::InterestLevel;

    #[test]
    fn test_model_notice_only_on_change() {
        let mut shown = "gemini-2.5-pro".to_string();
        let on = |model: &str| Turn::spoken("ann", "Ann", "hi", InterestLevel::Low, model);

        assert!(model_notice(&mut shown, &on("gemini-2.5-pro")).is_none());

        let notice = model_notice(&mut shown, &on("gemini-2.5-flash")).unwrap();
        assert!(notice.contains("Switched to gemini-2.5-flash"));
        assert_eq!(shown, "gemini-2.5-flash");
        assert!(model_notice(&mut shown, &on("gemini-2.5-flash")).is_none());

        let apology = Turn::apology("ann", "Ann", InterestLevel::Low);
        assert!(model_notice(&mut shown, &apology).is_none());
    }
}
