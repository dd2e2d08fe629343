//! Human-in-the-loop reviewer.
//!
//! Shows the draft on a writer and reads one line of feedback from a
//! reader. An empty line approves.

use async_trait::async_trait;
use draftloop_core::error::StepError;
use draftloop_core::step::{Artifact, Reviewer, Verdict};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stderr, Stdin};
use tokio::sync::Mutex;

/// Reviewer backed by a person at a terminal.
pub struct ConsoleReviewer<R, W> {
    io: Mutex<(R, W)>,
    approval_token: String,
}

impl ConsoleReviewer<BufReader<Stdin>, Stderr> {
    /// Read feedback from stdin; drafts and prompts go to stderr.
    pub fn stdio(approval_token: impl Into<String>) -> Self {
        Self::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stderr(),
            approval_token,
        )
    }
}

impl<R, W> ConsoleReviewer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, approval_token: impl Into<String>) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
            approval_token: approval_token.into(),
        }
    }

    fn prompt(artifact: &Artifact) -> String {
        format!(
            "\n----- draft -----\n{artifact}\n-----------------\n\
             Feedback (press Enter to approve): "
        )
    }
}

fn input_error(e: std::io::Error) -> StepError {
    StepError::Input(e.to_string())
}

#[async_trait]
impl<R, W> Reviewer for ConsoleReviewer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn review(&self, artifact: &Artifact) -> Result<Verdict, StepError> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writer
            .write_all(Self::prompt(artifact).as_bytes())
            .await
            .map_err(input_error)?;
        writer.flush().await.map_err(input_error)?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await.map_err(input_error)?;
        if read == 0 {
            return Err(StepError::Input("reviewer input closed".into()));
        }

        let feedback = line.trim_end_matches(['\r', '\n']);
        if feedback.trim().is_empty() {
            Ok(Verdict::new(self.approval_token.clone()))
        } else {
            Ok(Verdict::new(feedback))
        }
    }
}
