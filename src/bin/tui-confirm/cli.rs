use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tui_confirm::{
    ConfirmConfig, ConfirmContext, ConfirmError, ConfirmFactory, ConfirmProps, ConfirmState, Document,
    DirectMounter, View,
};

use crate::dialog::{confirm_dialog, Question};
use crate::terminal::{init_terminal, restore_terminal, Backend, Event, EventHandler};

/// Ask a yes/no question in the terminal
///
/// Prints `yes`, `no` or `cancelled`; exits 0 on yes, 1 otherwise
#[derive(Parser)]
#[command(name = "tui-confirm", version)]
pub struct Cli {
    /// Question to ask (positional)
    #[arg(default_value = "Are you sure?")]
    pub message: String,

    /// Dialog title
    #[arg(short = 't', long = "title", default_value = "Confirm")]
    pub title: String,

    /// Render through a shared mount point instead of a dedicated root
    #[arg(short = 'p', long = "portal")]
    pub portal: bool,

    /// Grace delay before the dialog is removed, in milliseconds
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,

    /// Configuration file (defaults to ./.tui-confirm.json or ./tui-confirm.json)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

type DialogFn = fn(ConfirmProps<Question, bool, ()>) -> Result<Box<dyn View>>;

impl Cli {
    /// Run the dialog, returning whether the user confirmed
    pub async fn execute(self) -> Result<bool> {
        let mut config = ConfirmConfig::init(self.config.as_deref()).await?;
        if let Some(delay) = self.delay_ms {
            config.unmount_delay_ms = delay;
        }
        debug!("Using configuration: {:?}", config);

        let document = Document::new();
        let factory: ConfirmFactory<DialogFn, Question, bool, ()> = if self.portal {
            let context = ConfirmContext::new(config.portal_options(), config.confirm_options());
            let host = document.create_element(document.body())?;
            document.create_root(host)?.render(Box::new(context.mount_point()))?;
            context.create_confirmation(confirm_dialog as DialogFn)
        } else {
            ConfirmFactory::new(
                Arc::new(DirectMounter::new(document.clone())),
                confirm_dialog as DialogFn,
                config.confirm_options(),
            )
        };

        let question = Question {
            title: self.title,
            message: self.message,
        };

        let mut terminal = init_terminal()?;
        let result = run(&mut terminal, &document, &factory, question).await;
        restore_terminal(&mut terminal)?;

        let (label, confirmed) = outcome(result?)?;
        info!("Outcome: {}", label);
        println!("{}", label);
        Ok(confirmed)
    }
}

/// Label printed for an answer, and whether it counts as confirmed
fn outcome(answer: Result<bool, ConfirmError<()>>) -> Result<(&'static str, bool)> {
    match answer {
        Ok(true) => Ok(("yes", true)),
        Ok(false) => Ok(("no", false)),
        Err(ConfirmError::Rejected(())) => Ok(("cancelled", false)),
        Err(e) => Err(e.into()),
    }
}

async fn run(
    terminal: &mut ratatui::Terminal<Backend>,
    document: &Document,
    factory: &ConfirmFactory<DialogFn, Question, bool, ()>,
    question: Question,
) -> Result<Result<bool, ConfirmError<()>>> {
    let mut confirmation = factory.invoke(question);
    let tracker = confirmation.tracker();
    let mut events = EventHandler::new();

    let answer = loop {
        terminal.draw(|frame| {
            let area = frame.size();
            document.render(frame, area);
        })?;

        tokio::select! {
            answer = &mut confirmation => break answer,
            event = events.next() => match event? {
                Event::Key(key) => {
                    document.handle_key_event(key)?;
                }
                Event::Resize(width, height) => debug!("Resized to {}x{}", width, height),
                Event::Tick => {}
            },
        }
    };

    // Keep drawing until the dialog is actually gone.
    while factory.mounter().mounted_count() > 0 {
        terminal.draw(|frame| {
            let area = frame.size();
            document.render(frame, area);
        })?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if tracker.get() == ConfirmState::Failed {
        debug!("Dialog never mounted");
    }

    Ok(answer)
}
