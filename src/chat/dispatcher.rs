use crate::chat::{ChatEvent, Notifier};
use crate::crawl::CrawlReport;
use crate::error::{RagbotError, Result};
use crate::quota::QuotaTracker;

const UPLOAD_PREFIX: &str = "/upload";
const QUESTION_PREFIX: &str = "/question";

const THINKING_NOTICE: &str = "ragbot is thinking...\n\n\
*Reminder: I am still learning so my answers may be inaccurate.*";

const UPLOAD_ACK_NOTICE: &str = "Upload received, ingesting documents...";

const INVALID_URL_NOTICE: &str = "That doesn't look like a supported GitHub folder URL. \
Expected: https://github.com/<owner>/<repo>/tree/<branch>/<path>";

const GENERIC_FAILURE_NOTICE: &str = "An error occurred while processing your request.";

/// Runs one crawl-and-ingest for a source URL
#[allow(async_fn_in_trait)]
pub trait Ingestor {
    async fn run(&self, source_url: &str) -> Result<CrawlReport>;
}

/// Produces a retrieval-augmented answer for a question
#[allow(async_fn_in_trait)]
pub trait Answerer {
    async fn answer(&self, question: &str) -> Result<String>;
}

enum Command<'a> {
    Upload(&'a str),
    Question(&'a str),
}

fn parse_command(content: &str) -> Option<Command<'_>> {
    if let Some(args) = content.strip_prefix(UPLOAD_PREFIX) {
        Some(Command::Upload(args.trim()))
    } else if let Some(args) = content.strip_prefix(QUESTION_PREFIX) {
        Some(Command::Question(args.trim()))
    } else {
        None
    }
}

/// Routes inbound chat events to the ingestion or answer path.
///
/// The dispatcher is the error boundary of the whole system: every inbound
/// event ends in exactly one terminal notice or a silent ignore, and no
/// failure in routed work escapes past [`on_message`](Self::on_message).
pub struct Dispatcher<N, I, A> {
    target_channel_id: String,
    quota: QuotaTracker,
    notifier: N,
    ingestor: I,
    answerer: A,
}

impl<N: Notifier, I: Ingestor, A: Answerer> Dispatcher<N, I, A> {
    pub fn new(
        target_channel_id: String,
        quota: QuotaTracker,
        notifier: N,
        ingestor: I,
        answerer: A,
    ) -> Self {
        Self {
            target_channel_id,
            quota,
            notifier,
            ingestor,
            answerer,
        }
    }

    /// Handle one inbound chat event, fire-and-forget.
    pub async fn on_message(&self, event: ChatEvent) {
        if event.author_is_bot {
            return;
        }
        if event.channel_id != self.target_channel_id {
            return;
        }
        let Some(command) = parse_command(event.content.trim()) else {
            return;
        };

        if !self.quota.admit(&event.author_id) {
            log::info!("Quota exceeded for user {}", event.author_id);
            let notice = format!(
                "You have reached the maximum number of {} requests per minute. \
                 Please wait a moment before trying again.",
                self.quota.limit()
            );
            self.send(&event.channel_id, &notice).await;
            return;
        }

        match command {
            Command::Upload(url) => self.handle_upload(&event.channel_id, url).await,
            Command::Question(question) => {
                self.handle_question(&event.channel_id, question).await
            }
        }
    }

    async fn handle_upload(&self, channel_id: &str, source_url: &str) {
        self.send(channel_id, UPLOAD_ACK_NOTICE).await;

        match self.ingestor.run(source_url).await {
            Ok(report) => {
                let notice = format!(
                    "Upload complete: {} document(s) ingested, {} skipped, {} failed.",
                    report.ingested, report.skipped, report.failed
                );
                self.send(channel_id, &notice).await;
            }
            Err(RagbotError::InvalidSourceUrl(url)) => {
                log::warn!("Rejected upload with invalid source URL: {}", url);
                self.send(channel_id, INVALID_URL_NOTICE).await;
            }
            Err(e) => {
                log::error!("Upload of {} failed: {}", source_url, e);
                self.send(channel_id, GENERIC_FAILURE_NOTICE).await;
            }
        }
    }

    async fn handle_question(&self, channel_id: &str, question: &str) {
        self.send(channel_id, THINKING_NOTICE).await;

        match self.answerer.answer(question).await {
            Ok(answer) => self.send(channel_id, &answer).await,
            Err(e) => {
                log::error!("Failed to answer question: {}", e);
                self.send(channel_id, GENERIC_FAILURE_NOTICE).await;
            }
        }
    }

    /// Deliver a notice; delivery failure is logged, never propagated.
    async fn send(&self, channel_id: &str, text: &str) {
        if let Err(e) = self.notifier.notify(channel_id, text).await {
            log::error!("Failed to send notice to {}: {}", channel_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(&self, channel_id: &str, text: &str) -> Result<()> {
            self.notices
                .lock()
                .unwrap()
                .push((channel_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeIngestor {
        calls: Mutex<Vec<String>>,
        fail_with: Mutex<Option<RagbotError>>,
    }

    impl Ingestor for FakeIngestor {
        async fn run(&self, source_url: &str) -> Result<CrawlReport> {
            self.calls.lock().unwrap().push(source_url.to_string());
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            Ok(CrawlReport {
                listed_dirs: 1,
                ingested: 2,
                skipped: 1,
                failed: 0,
            })
        }
    }

    #[derive(Default)]
    struct FakeAnswerer {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Answerer for FakeAnswerer {
        async fn answer(&self, question: &str) -> Result<String> {
            self.calls.lock().unwrap().push(question.to_string());
            if self.fail {
                return Err(RagbotError::Completion("boom".to_string()));
            }
            Ok("The answer is 42.".to_string())
        }
    }

    fn dispatcher(
        quota_limit: u32,
    ) -> Dispatcher<RecordingNotifier, FakeIngestor, FakeAnswerer> {
        Dispatcher::new(
            "chan-42".to_string(),
            QuotaTracker::new(quota_limit, 60_000),
            RecordingNotifier::default(),
            FakeIngestor::default(),
            FakeAnswerer::default(),
        )
    }

    fn event(channel_id: &str, author_id: &str, bot: bool, content: &str) -> ChatEvent {
        ChatEvent {
            channel_id: channel_id.to_string(),
            author_id: author_id.to_string(),
            author_is_bot: bot,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ignores_bot_authors() {
        let d = dispatcher(5);
        d.on_message(event("chan-42", "botty", true, "/question hi")).await;
        assert!(d.notifier.notices.lock().unwrap().is_empty());
        assert!(d.answerer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignores_other_channels() {
        let d = dispatcher(5);
        d.on_message(event("chan-99", "alice", false, "/question hi")).await;
        assert!(d.notifier.notices.lock().unwrap().is_empty());
        assert!(d.answerer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignores_unrecognized_content() {
        let d = dispatcher(5);
        d.on_message(event("chan-42", "alice", false, "hello there")).await;
        assert!(d.notifier.notices.lock().unwrap().is_empty());
        assert!(d.ingestor.calls.lock().unwrap().is_empty());
        assert!(d.answerer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_question_sends_thinking_then_answer() {
        let d = dispatcher(5);
        d.on_message(event("chan-42", "alice", false, "/question what is ragbot?"))
            .await;

        assert_eq!(*d.answerer.calls.lock().unwrap(), vec!["what is ragbot?"]);
        let notices = d.notifier.notices.lock().unwrap();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].1.contains("thinking"));
        assert_eq!(notices[1].1, "The answer is 42.");
        assert_eq!(notices[0].0, "chan-42");
    }

    #[tokio::test]
    async fn test_upload_sends_ack_then_summary() {
        let d = dispatcher(5);
        d.on_message(event(
            "chan-42",
            "alice",
            false,
            "/upload https://github.com/acme/repo/tree/main/docs",
        ))
        .await;

        assert_eq!(
            *d.ingestor.calls.lock().unwrap(),
            vec!["https://github.com/acme/repo/tree/main/docs"]
        );
        let notices = d.notifier.notices.lock().unwrap();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].1.contains("ingesting"));
        assert!(notices[1].1.contains("2 document(s) ingested"));
    }

    #[tokio::test]
    async fn test_quota_denial_sends_quota_notice_only() {
        let d = dispatcher(1);
        d.on_message(event("chan-42", "alice", false, "/question one")).await;
        d.on_message(event("chan-42", "alice", false, "/question two")).await;

        // Second question never reaches the answerer
        assert_eq!(d.answerer.calls.lock().unwrap().len(), 1);
        let notices = d.notifier.notices.lock().unwrap();
        let last = &notices.last().unwrap().1;
        // Quota notice is distinguishable from the generic failure notice
        assert!(last.contains("maximum number of 1 requests"));
        assert_ne!(last, GENERIC_FAILURE_NOTICE);
    }

    #[tokio::test]
    async fn test_quota_is_per_user() {
        let d = dispatcher(1);
        d.on_message(event("chan-42", "alice", false, "/question one")).await;
        d.on_message(event("chan-42", "bob", false, "/question two")).await;

        // Bob's window is untouched by Alice's
        assert_eq!(d.answerer.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_source_url_gets_specific_notice() {
        let d = dispatcher(5);
        *d.ingestor.fail_with.lock().unwrap() =
            Some(RagbotError::InvalidSourceUrl("nope".to_string()));
        d.on_message(event("chan-42", "alice", false, "/upload nope")).await;

        let notices = d.notifier.notices.lock().unwrap();
        assert!(notices.last().unwrap().1.contains("GitHub folder URL"));
    }

    #[tokio::test]
    async fn test_routing_errors_become_generic_failure_notice() {
        let d = dispatcher(5);
        *d.ingestor.fail_with.lock().unwrap() = Some(RagbotError::Fetch {
            path: "docs".to_string(),
            reason: "HTTP 500".to_string(),
        });
        d.on_message(event(
            "chan-42",
            "alice",
            false,
            "/upload https://github.com/acme/repo/tree/main/docs",
        ))
        .await;

        let notices = d.notifier.notices.lock().unwrap();
        assert_eq!(notices.last().unwrap().1, GENERIC_FAILURE_NOTICE);
    }

    #[tokio::test]
    async fn test_answer_failure_becomes_generic_failure_notice() {
        let mut d = dispatcher(5);
        d.answerer.fail = true;
        d.on_message(event("chan-42", "alice", false, "/question hi")).await;

        let notices = d.notifier.notices.lock().unwrap();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].1, GENERIC_FAILURE_NOTICE);
    }
}
