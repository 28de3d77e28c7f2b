use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::domain::ReplyPart;

use super::super::Container;

const PROMPT: &str = "> ";

pub struct ChatController<'a> {
    container: &'a Container,
}

impl<'a> ChatController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// One message in a throwaway session.
    pub async fn ask(&self, message: String) -> Result<String> {
        let sessions = self.container.session_manager();
        let session_id = sessions.start_session().await;
        let outcome = sessions.handle(&session_id, &message).await;
        sessions.end_session(&session_id).await;
        Ok(outcome.reply)
    }

    /// Line-oriented conversation on stdin/stdout. `/reset` starts a new
    /// session, `/quit` (or end of input) leaves.
    pub async fn chat(&self, session: Option<String>) -> Result<String> {
        let sessions = self.container.session_manager();
        let mut session_id = match session {
            Some(id) => id,
            None => sessions.start_session().await,
        };
        debug!("Chatting in session {}", session_id);

        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let greeting = self.container.renderer().render(&[ReplyPart::Menu]);
        stdout.write_all(format!("{}\n\n{}", greeting, PROMPT).as_bytes()).await?;
        stdout.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let reply = match line.trim() {
                "" => None,
                "/quit" | "/exit" => break,
                "/reset" => {
                    sessions.end_session(&session_id).await;
                    session_id = sessions.start_session().await;
                    Some("Started a new conversation.".to_string())
                }
                message => Some(sessions.handle(&session_id, message).await.reply),
            };
            if let Some(reply) = reply {
                stdout.write_all(format!("{}\n\n", reply).as_bytes()).await?;
            }
            stdout.write_all(PROMPT.as_bytes()).await?;
            stdout.flush().await?;
        }

        sessions.end_session(&session_id).await;
        Ok("Goodbye!".to_string())
    }
}
