//! REPL (Read-Eval-Print Loop) for interactive CLI
//!
//! One thread per session. Whenever the thread is suspended at the approval
//! interrupt, the loop asks for a y/n decision before taking new input.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::orchestrator::{Decision, TurnOrchestrator, TurnRequest, TurnResponse};

/// Interactive session over one thread
pub struct Repl<'a> {
    orchestrator: &'a TurnOrchestrator,
    thread_id: Option<String>,
}

impl<'a> Repl<'a> {
    pub fn new(orchestrator: &'a TurnOrchestrator) -> Self {
        Self {
            orchestrator,
            thread_id: None,
        }
    }

    /// Continue an existing thread instead of starting a new one
    pub fn with_thread(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Run on stdin/stdout
    pub async fn run(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        self.run_with(stdin.lock(), std::io::stdout()).await
    }

    /// Run the loop until `quit`, `exit` or end of input
    pub async fn run_with<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> Result<()> {
        writeln!(out, "SQL Assistant ready. Type 'exit' or 'quit' to stop.")?;

        loop {
            if let Some(query) = self.pending_query().await? {
                writeln!(out)?;
                writeln!(out, "{} Approval Required {}", "*".repeat(30), "*".repeat(30))?;
                writeln!(out, "Proposed query:\n{}", query)?;

                let Some(answer) = prompt(&mut input, &mut out, "Do you approve this query? (y/n): ")? else {
                    break;
                };

                if answer.eq_ignore_ascii_case("y") {
                    writeln!(out, "Approved. Executing locally...")?;
                    self.decide(Decision::Approve, None, &mut out).await?;
                } else {
                    let Some(feedback) = prompt(&mut input, &mut out, "Please provide feedback/correction: ")? else {
                        break;
                    };
                    writeln!(out, "Sending feedback to agent...")?;
                    self.decide(Decision::Reject, Some(&feedback), &mut out).await?;
                }
                continue;
            }

            writeln!(out, "\n{}", "=".repeat(80))?;
            let Some(text) = prompt(&mut input, &mut out, "User: ")? else {
                break;
            };
            if text.is_empty() {
                continue;
            }
            if text == "quit" || text == "exit" {
                break;
            }

            let request = TurnRequest::new(self.thread_id.clone(), text);
            match self.orchestrator.start_or_continue(request).await {
                Ok(response) => {
                    self.thread_id = Some(response.thread_id.clone());
                    print_response(&mut out, &response)?;
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            }
        }

        writeln!(out, "Goodbye!")?;
        Ok(())
    }

    async fn pending_query(&self) -> Result<Option<String>> {
        match &self.thread_id {
            Some(thread_id) => Ok(self.orchestrator.pending_query(thread_id).await?),
            None => Ok(None),
        }
    }

    async fn decide<W: Write>(&self, decision: Decision, feedback: Option<&str>, out: &mut W) -> Result<()> {
        let Some(thread_id) = &self.thread_id else {
            return Ok(());
        };

        match self
            .orchestrator
            .resolve_approval(thread_id, decision, feedback)
            .await
        {
            Ok(response) => print_response(out, &response)?,
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
        Ok(())
    }
}

/// Print `label` and read one trimmed line; `None` at end of input
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{}", label)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Print a turn result the way the interactive session shows it
pub fn print_response<W: Write>(out: &mut W, response: &TurnResponse) -> Result<()> {
    writeln!(out, "\n{} Agent Response {}", "=".repeat(34), "=".repeat(34))?;
    writeln!(out, "{}", response.message)?;
    Ok(())
}
