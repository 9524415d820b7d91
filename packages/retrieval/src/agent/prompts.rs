//! Prompt templates for grounded answering.

/// The canonical phrase a grounded completion uses when the supplied
/// context cannot answer the question. Compared against the trimmed
/// completion text, exactly; no fuzzy matching.
pub const UNKNOWN_ANSWER: &str = "I don't know.";

/// Prompt for answering a single question from retrieved context.
pub const ANSWER_WITH_CONTEXT_PROMPT: &str = r#"Answer the question as specifically as possible and with as much detail as possible using the provided context. If the answer is not contained within the text below, say "I don't know". Do not speak off topic to the question, make sure to answer the question in full.
Context: {context}

Q: {question}
A:"#;

/// Prompt for answering conversationally from retrieved context.
pub const CHAT_WITH_CONTEXT_PROMPT: &str = r#"You are an AI assistant for an encyclopedia. You are given the following extracted parts of a long document and a question. Provide a conversational answer to the question as specifically as possible and with as much detail as possible using the provided context. If the answer is not contained within the extracted text below, say "I don't know". Do not speak off topic to the question, make sure to answer the question in full and do NOT make up an answer.
====
{context}
====
Question: {question}
Answer:"#;

/// One (human, agent) turn of history, as fed to the rewrite prompt.
pub const CHAT_TURN_TEMPLATE: &str = "Human: {human_text}\nAI: {agent_text}";

/// Prompt for rewriting a follow-up question as a standalone question.
pub const CHAT_SUMMARIZE_PROMPT: &str = r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question by incorporating the conversation history. You should assume that the question is related more to the questions at the end of the history, do not create a new chat history.

===
Chat History:
{chat_history}
===
Follow Up Question: {question}
Standalone Question:"#;

/// Prompt for deriving search queries from a question.
pub const QUERY_GENERATION_PROMPT: &str = r#"Please turn the following question into a list of search queries for an encyclopedia. Each query should help answer the question and be very specific to the question. Put each query on a line. Limit yourself to three queries and do not include more queries than you need. It is better to have fewer queries.

Examples:

Question: Who is Barack Obama and what were his accomplishments?
Barack Obama

Question: Can you compare avocadoes to oranges?
Avocadoes
Oranges

Question: When was Joseph Pulitzer born and what is the Pulitzer Prize?
Joseph Pulitzer
Pulitzer Prize


Question: {question}
"#;

/// Format the single-question answer prompt.
pub fn format_answer_prompt(context: &str, question: &str) -> String {
    ANSWER_WITH_CONTEXT_PROMPT
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Format the conversational answer prompt.
pub fn format_chat_prompt(context: &str, question: &str) -> String {
    CHAT_WITH_CONTEXT_PROMPT
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Format one history turn.
pub fn format_chat_turn(human_text: &str, agent_text: &str) -> String {
    CHAT_TURN_TEMPLATE
        .replace("{human_text}", human_text)
        .replace("{agent_text}", agent_text)
}

/// Format the standalone-question rewrite prompt.
pub fn format_summarize_prompt(chat_history: &str, question: &str) -> String {
    CHAT_SUMMARIZE_PROMPT
        .replace("{chat_history}", chat_history)
        .replace("{question}", question)
}

/// Format the search-query generation prompt.
pub fn format_query_generation_prompt(question: &str) -> String {
    QUERY_GENERATION_PROMPT.replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_prompt_substitution() {
        let prompt = format_answer_prompt("* Paris is in France.", "Where is Paris?");
        assert!(prompt.contains("* Paris is in France."));
        assert!(prompt.contains("Q: Where is Paris?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_chat_turn_substitution() {
        let turn = format_chat_turn("Hello", "Hi there");
        assert_eq!(turn, "Human: Hello\nAI: Hi there");
    }

    #[test]
    fn test_summarize_prompt_substitution() {
        let prompt = format_summarize_prompt("Human: a\nAI: b", "And then?");
        assert!(prompt.contains("Human: a\nAI: b"));
        assert!(prompt.contains("Follow Up Question: And then?"));
    }

    #[test]
    fn test_query_generation_substitution() {
        let prompt = format_query_generation_prompt("What is the Pulitzer Prize?");
        assert!(prompt.ends_with("Question: What is the Pulitzer Prize?\n"));
    }
}
