//! The conversation/retrieval state machine.
//!
//! A turn moves `Idle → Answering`, and from there either straight to
//! `Done` (the context was sufficient) or through `Reindexing → Answering`
//! once more (the completion said it did not know). The insufficient-context
//! transition is a value comparison against [`prompts::UNKNOWN_ANSWER`], not
//! an error path, and the retry happens exactly once.

pub mod prompts;

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::corpus::CorpusDatabase;
use crate::error::{Result, RetrievalError};
use crate::text::Tokenizer;
use crate::traits::{CompletionProvider, EmbeddingProvider, TitleSearcher};
use crate::types::ChatEntry;

use self::prompts::UNKNOWN_ANSWER;

/// Interim reply streamed while the agent goes off to reindex.
const INTERIM_REPLY: &str = "I don't know, let me see if I can find out";

/// Which grounded prompt a turn uses.
#[derive(Clone, Copy)]
enum PromptKind {
    /// Single-question answering.
    Single,
    /// Conversational answering.
    Chat,
}

/// Answers questions from the corpus, reindexing on a miss.
///
/// Consumers interact only through [`answer_query`], [`chat`],
/// [`chat_streaming`], and [`chat_with_cancel`]; transport is someone
/// else's problem.
///
/// [`answer_query`]: RetrievalAgent::answer_query
/// [`chat`]: RetrievalAgent::chat
/// [`chat_streaming`]: RetrievalAgent::chat_streaming
/// [`chat_with_cancel`]: RetrievalAgent::chat_with_cancel
pub struct RetrievalAgent<E, C, S> {
    corpus: CorpusDatabase<E, S>,
    completer: C,
    tokenizer: Arc<Tokenizer>,
    config: AgentConfig,
}

impl<E, C, S> RetrievalAgent<E, C, S>
where
    E: EmbeddingProvider,
    C: CompletionProvider,
    S: TitleSearcher,
{
    /// Create an agent with default tunables.
    pub fn new(corpus: CorpusDatabase<E, S>, completer: C, tokenizer: Arc<Tokenizer>) -> Self {
        Self::with_config(corpus, completer, tokenizer, AgentConfig::default())
    }

    /// Create an agent with explicit tunables.
    pub fn with_config(
        corpus: CorpusDatabase<E, S>,
        completer: C,
        tokenizer: Arc<Tokenizer>,
        config: AgentConfig,
    ) -> Self {
        Self {
            corpus,
            completer,
            tokenizer,
            config,
        }
    }

    /// The agent's tunables.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The underlying corpus.
    pub fn corpus(&self) -> &CorpusDatabase<E, S> {
        &self.corpus
    }

    /// Answer a single question from the corpus.
    ///
    /// If the grounded completion answers with the canonical unknown phrase,
    /// the agent reindexes once and retries once, returning whatever the
    /// second attempt produces even if it is again unknown.
    pub async fn answer_query(&self, question: &str) -> Result<ChatEntry> {
        let (mut answer, mut context) = self.answer_once(question, PromptKind::Single).await?;

        if answer == UNKNOWN_ANSWER {
            info!(question = %question, "insufficient context, reindexing");
            self.reindex_for(question).await?;
            (answer, context) = self.answer_once(question, PromptKind::Single).await?;
        }

        Ok(ChatEntry::agent(answer).with_context(context))
    }

    /// Answer the latest turn of a conversation.
    pub async fn chat(&self, chat: &[ChatEntry]) -> Result<ChatEntry> {
        let question = self.summarize_chat(chat).await?;
        let (mut answer, mut context) = self.answer_once(&question, PromptKind::Chat).await?;

        if answer == UNKNOWN_ANSWER {
            info!(question = %question, "insufficient context, reindexing");
            self.reindex_for(&question).await?;
            (answer, context) = self.answer_once(&question, PromptKind::Chat).await?;
        }

        Ok(ChatEntry::agent(answer).with_context(context))
    }

    /// [`chat`](RetrievalAgent::chat) with cooperative cancellation.
    pub async fn chat_with_cancel(
        &self,
        chat: &[ChatEntry],
        cancel: CancellationToken,
    ) -> Result<ChatEntry> {
        tokio::select! {
            result = self.chat(chat) => result,
            _ = cancel.cancelled() => Err(RetrievalError::Cancelled),
        }
    }

    /// Answer the latest turn of a conversation, reporting progress.
    ///
    /// The stream is lazy and pull-driven. With sufficient context it yields
    /// exactly one entry (`isStop: true`, `isTransient: false`). Otherwise
    /// it yields an interim reply, one transient progress entry per newly
    /// indexed page, a transient stop entry with the retried answer, and a
    /// final non-transient stop entry. Abandoning the stream mid-reindex
    /// keeps whatever completed `add_page` calls already stored; pages are
    /// atomic, the sequence as a whole is not.
    pub fn chat_streaming(
        &self,
        chat: Vec<ChatEntry>,
    ) -> Pin<Box<dyn Stream<Item = Result<ChatEntry>> + Send + '_>> {
        Box::pin(stream! {
            let question = match self.summarize_chat(&chat).await {
                Ok(question) => question,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let (answer, context) = match self.answer_once(&question, PromptKind::Chat).await {
                Ok(result) => result,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            if answer != UNKNOWN_ANSWER {
                yield Ok(ChatEntry::agent(answer)
                    .with_context(context)
                    .stop(true)
                    .transient(false));
                return;
            }

            info!(question = %question, "insufficient context, reindexing");
            yield Ok(ChatEntry::agent(INTERIM_REPLY).with_context(context));

            let candidates = match self.collect_candidate_pages(&question).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for (title, raw_page) in candidates {
                yield Ok(ChatEntry::agent(format!("I'm reading... {title}"))
                    .with_context("")
                    .transient(true)
                    .stop(false));
                if let Err(e) = self.corpus.add_page(&title, &raw_page).await {
                    warn!(title = %title, error = %e, "page skipped during reindex");
                }
            }

            let (answer, context) = match self.answer_once(&question, PromptKind::Chat).await {
                Ok(result) => result,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            yield Ok(ChatEntry::agent(answer.clone())
                .with_context(context.clone())
                .stop(true)
                .transient(true));
            yield Ok(ChatEntry::agent(answer)
                .with_context(context)
                .stop(true)
                .transient(false));
        })
    }

    /// Reduce a conversation to one standalone question.
    ///
    /// History is paired into (user, agent) turns; with history present the
    /// latest user turn is rewritten against it via the completion provider,
    /// otherwise it is used verbatim.
    pub async fn summarize_chat(&self, chat: &[ChatEntry]) -> Result<String> {
        let last = chat.last().ok_or_else(|| RetrievalError::InvalidChat {
            reason: "chat is empty".to_string(),
        })?;
        let question = last.content.clone();

        if chat.len() <= 2 {
            return Ok(question);
        }

        let history = chat[..chat.len() - 1]
            .chunks_exact(2)
            .map(|pair| prompts::format_chat_turn(&pair[0].content, &pair[1].content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = prompts::format_summarize_prompt(&history, &question);
        let rewritten = self
            .completer
            .complete(&prompt, self.config.max_completion_tokens)
            .await?;
        let rewritten = rewritten.trim().to_string();
        debug!(standalone = %rewritten, "rewrote follow-up question");
        Ok(rewritten)
    }

    /// One Answering pass: assemble context, complete, trim.
    async fn answer_once(&self, question: &str, kind: PromptKind) -> Result<(String, String)> {
        let context = self.context_for_question(question).await?;
        let prompt = match kind {
            PromptKind::Single => prompts::format_answer_prompt(&context, question),
            PromptKind::Chat => prompts::format_chat_prompt(&context, question),
        };
        let answer = self
            .completer
            .complete(&prompt, self.config.max_completion_tokens)
            .await?;
        Ok((answer.trim().to_string(), context))
    }

    /// Greedily assemble a context window from the nearest sections.
    ///
    /// Sections are accepted in similarity order until the next one would
    /// push the window past the token budget; each accepted section is
    /// charged its own tokens plus the separator's.
    async fn context_for_question(&self, question: &str) -> Result<String> {
        let sections = self
            .corpus
            .store()
            .nearest_sections(question, self.config.search_k)
            .await?;
        debug!(neighbors = sections.len(), "retrieved nearest sections");

        let separator = self.config.context_separator.as_str();
        let separator_tokens = self.tokenizer.count(separator);

        let mut context = String::new();
        let mut used_tokens = 0usize;
        for section in &sections {
            used_tokens += section.token_count as usize + separator_tokens;
            if used_tokens > self.config.max_context_tokens {
                break;
            }
            context.push_str(separator);
            context.push_str(&section.content.replace('\n', " "));
        }
        Ok(context)
    }

    /// Derive up to three search queries for the question, plus the
    /// question itself.
    async fn generate_search_queries(&self, question: &str) -> Result<Vec<String>> {
        let prompt = prompts::format_query_generation_prompt(question);
        let output = self
            .completer
            .complete(&prompt, self.config.max_completion_tokens)
            .await?;

        let mut queries: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(3)
            .map(String::from)
            .collect();
        queries.push(question.to_string());
        debug!(?queries, "generated search queries");
        Ok(queries)
    }

    /// Resolve search queries to fetchable pages not yet indexed.
    ///
    /// Titles are deduplicated preserving first-seen order. A failed title
    /// search or archive read affects only its own query or page.
    async fn collect_candidate_pages(&self, question: &str) -> Result<Vec<(String, String)>> {
        let queries = self.generate_search_queries(question).await?;

        let mut seen = HashSet::new();
        let mut pages = Vec::new();
        for query in &queries {
            let titles = match self.corpus.search_titles(query).await {
                Ok(titles) => titles,
                Err(e) => {
                    warn!(query = %query, error = %e, "title search failed");
                    continue;
                }
            };
            for title in titles {
                if !seen.insert(title.clone()) || self.corpus.is_indexed(&title) {
                    continue;
                }
                match self.corpus.page(&title) {
                    Ok(Some(raw_page)) => pages.push((title, raw_page)),
                    Ok(None) => {}
                    Err(e) => warn!(title = %title, error = %e, "archive read failed"),
                }
            }
        }
        Ok(pages)
    }

    /// The Reindexing state: fetch, sectionize, embed, and append candidate
    /// pages. One page's failure never aborts the rest.
    async fn reindex_for(&self, question: &str) -> Result<Vec<String>> {
        let candidates = self.collect_candidate_pages(question).await?;

        let mut indexed = Vec::new();
        for (title, raw_page) in candidates {
            match self.corpus.add_page(&title, &raw_page).await {
                Ok(appended) if appended > 0 => indexed.push(title),
                Ok(_) => {}
                Err(e) => warn!(title = %title, error = %e, "page skipped during reindex"),
            }
        }
        info!(pages = indexed.len(), "reindex complete");
        Ok(indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveIndex, ArchiveReader};
    use crate::store::{EmbeddingIndex, SectionStore};
    use crate::testing::{MockCompleter, MockEmbedder};
    use crate::text::Sectionizer;
    use crate::traits::MockTitleSearcher;
    use crate::types::ChatEntry;
    use std::io::Write;

    const DIM: usize = 8;

    fn agent_with(
        completer: MockCompleter,
        searcher: MockTitleSearcher,
    ) -> RetrievalAgent<MockEmbedder, MockCompleter, MockTitleSearcher> {
        let mut manifest = tempfile::NamedTempFile::new().unwrap();
        writeln!(manifest, "0:1:Phantom").unwrap();
        let archive_index = ArchiveIndex::build_from_manifest(manifest.path()).unwrap();

        let tokenizer = Arc::new(Tokenizer::cl100k().unwrap());
        let store = SectionStore::new(
            EmbeddingIndex::new(MockEmbedder::new(DIM), DIM),
            Sectionizer::new(tokenizer.clone(), 500),
        );
        let corpus = CorpusDatabase::new(
            archive_index,
            ArchiveReader::new("/nonexistent/dump.bz2"),
            store,
            searcher,
        );
        RetrievalAgent::new(corpus, completer, tokenizer)
    }

    #[tokio::test]
    async fn test_summarize_chat_short_history_is_verbatim() {
        let agent = agent_with(MockCompleter::new("unused"), MockTitleSearcher::new());
        let chat = vec![ChatEntry::user("What is the Apollo program?")];

        let question = agent.summarize_chat(&chat).await.unwrap();
        assert_eq!(question, "What is the Apollo program?");
        assert_eq!(agent.completer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_chat_rewrites_with_history() {
        let completer = MockCompleter::new("unused")
            .with_rule("Standalone Question:", "When did the Apollo program end?");
        let agent = agent_with(completer, MockTitleSearcher::new());

        let chat = vec![
            ChatEntry::user("What is the Apollo program?"),
            ChatEntry::agent("A spaceflight program."),
            ChatEntry::user("When did it end?"),
        ];

        let question = agent.summarize_chat(&chat).await.unwrap();
        assert_eq!(question, "When did the Apollo program end?");

        let prompt = &agent.completer.prompts()[0];
        assert!(prompt.contains("Human: What is the Apollo program?"));
        assert!(prompt.contains("AI: A spaceflight program."));
        assert!(prompt.contains("Follow Up Question: When did it end?"));
    }

    #[tokio::test]
    async fn test_summarize_chat_empty_chat_is_invalid() {
        let agent = agent_with(MockCompleter::new("unused"), MockTitleSearcher::new());
        let err = agent.summarize_chat(&[]).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidChat { .. }));
    }

    #[tokio::test]
    async fn test_generate_search_queries_caps_at_three_plus_question() {
        let completer = MockCompleter::new("unused").with_rule(
            "list of search queries",
            "Apollo\n\n  Saturn V  \nMoon landing\nGemini program\n",
        );
        let agent = agent_with(completer, MockTitleSearcher::new());

        let queries = agent.generate_search_queries("Tell me about Apollo").await.unwrap();
        assert_eq!(
            queries,
            vec!["Apollo", "Saturn V", "Moon landing", "Tell me about Apollo"]
        );
    }

    #[tokio::test]
    async fn test_context_budget_accepts_greedily_until_exceeded() {
        let completer = MockCompleter::new("Some answer.");
        let mut agent = agent_with(completer, MockTitleSearcher::new());
        agent
            .corpus()
            .add_page("Topic", "First fact about the topic.\n== More ==\nSecond fact entirely.")
            .await
            .unwrap();
        assert_eq!(agent.corpus().store().row_count(), 2);

        // Budget sized so the first accepted section fits but a second
        // cannot.
        let first = agent.corpus().store().get_section(0).unwrap();
        let separator_tokens = agent.tokenizer.count(&agent.config.context_separator);
        agent.config = AgentConfig::default()
            .with_max_context_tokens(first.token_count as usize + separator_tokens);

        let context = agent
            .context_for_question(&first.content)
            .await
            .unwrap();
        assert!(!context.is_empty());
        assert!(agent.tokenizer.count(&context) <= agent.config.max_context_tokens);
    }

    #[tokio::test]
    async fn test_answer_query_returns_second_unknown_verbatim() {
        // Both attempts say unknown; no candidates exist, so the second
        // unknown comes back unchanged.
        let completer = MockCompleter::new(UNKNOWN_ANSWER);
        let agent = agent_with(completer, MockTitleSearcher::new());

        let entry = agent.answer_query("What is X?").await.unwrap();
        assert_eq!(entry.content, UNKNOWN_ANSWER);
        assert_eq!(entry.context.as_deref(), Some(""));
    }
}
