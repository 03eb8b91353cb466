//! Prompts for the judgment service.
//!
//! Structured prompts name the JSON key the decoder reads (`datasource` for
//! routing, `binary_score` for the graders). Changing a key here without
//! changing [`JudgmentKind::score_key`](ragloop_core::JudgmentKind::score_key)
//! turns every reply into a malformed judgment.

use ragloop_core::{EvidenceSet, Turn};

/// Router system prompt. `{domain}` is replaced with the store's coverage.
pub const ROUTER_INSTRUCTIONS: &str = r#"You are an expert at routing a user question to a vectorstore or web search.

The vectorstore contains {domain}.

Use the vectorstore for questions on these topics. For all else, and especially for current events, use web-search.

Return JSON with single key, datasource, that is 'websearch' or 'vectorstore' depending on the question."#;

pub const RELEVANCE_INSTRUCTIONS: &str = r#"You are a grader assessing relevance of a retrieved document to a user question.

If the document contains keyword(s) or semantic meaning related to the question, grade it as relevant."#;

pub const GROUNDING_INSTRUCTIONS: &str = r#"You are a teacher grading a quiz.

You will be given FACTS and a STUDENT ANSWER.

Here is the grade criteria to follow:

(1) Ensure the STUDENT ANSWER is grounded in the FACTS.

(2) Ensure the STUDENT ANSWER does not contain "hallucinated" information outside the scope of the FACTS.

Score:

A score of yes means that the student's answer meets all of the criteria. This is the highest (best) score.

A score of no means that the student's answer does not meet all of the criteria. This is the lowest possible score you can give.

Explain your reasoning in a step-by-step manner to ensure your reasoning and conclusion are correct.

Avoid simply stating the correct answer at the outset."#;

pub const USEFULNESS_INSTRUCTIONS: &str = r#"You are a teacher grading a quiz.

You will be given a QUESTION and a STUDENT ANSWER.

Here is the grade criteria to follow:

(1) The STUDENT ANSWER helps to answer the QUESTION

Score:

A score of yes means that the student's answer meets all of the criteria. This is the highest (best) score.

The student can receive a score of yes if the answer contains extra information that is not explicitly asked for in the question.

A score of no means that the student's answer does not meet all of the criteria. This is the lowest possible score you can give.

Explain your reasoning in a step-by-step manner to ensure your reasoning and conclusion are correct.

Avoid simply stating the correct answer at the outset."#;

pub const REWRITE_INSTRUCTIONS: &str = r#"You are a question re-writer that converts an input question to a better version that is optimized for web search.

Look at the input and try to reason about the underlying semantic intent or meaning.

Reply with the improved question only, without preamble or quotes."#;

/// Answer returned without a model call when there is no evidence at all.
pub const INSUFFICIENT_EVIDENCE_ANSWER: &str =
    "I don't have enough information to answer this question.";

pub fn router_instructions(domain: &str) -> String {
    ROUTER_INSTRUCTIONS.replace("{domain}", domain)
}

pub fn relevance_input(passage: &str, question: &str) -> String {
    format!(
        "Here is the retrieved document: \n\n {passage} \n\n Here is the user question: \n\n {question}. \n\n\
         Carefully and objectively assess whether the document contains at least some information that is relevant to the question.\n\n\
         Return JSON with single key, binary_score, that is 'yes' or 'no' score to indicate whether the document contains at least some information that is relevant to the question."
    )
}

pub fn grounding_input(evidence: &EvidenceSet, draft: &str) -> String {
    format!(
        "FACTS: \n\n {facts} \n\n STUDENT ANSWER: {draft}. \n\n\
         Return JSON with two keys, binary_score is 'yes' or 'no' score to indicate whether the STUDENT ANSWER is grounded in the FACTS. \
         And a key, explanation, that contains an explanation of the score.",
        facts = evidence.format_context()
    )
}

pub fn usefulness_input(question: &str, draft: &str) -> String {
    format!(
        "QUESTION: \n\n {question} \n\n STUDENT ANSWER: {draft}. \n\n\
         Return JSON with two keys, binary_score is 'yes' or 'no' score to indicate whether the STUDENT ANSWER meets the criteria. \
         And a key, explanation, that contains an explanation of the score."
    )
}

/// Generation prompt. History, when present, is included verbatim ahead of
/// the question.
pub fn generation_prompt(evidence: &EvidenceSet, question: &str, history: &[Turn]) -> String {
    let mut prompt = format!(
        "You are an assistant for question-answering tasks.\n\n\
         Here is the context to use to answer the question:\n\n{context}\n\n\
         Think carefully about the above context.\n\n",
        context = evidence.format_context()
    );

    if !history.is_empty() {
        prompt.push_str("Here is the conversation so far:\n\n");
        for turn in history {
            prompt.push_str(turn.role.as_str());
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Now, review the user question:\n\n{question}\n\n\
         Provide an answer to this question using only the above context.\n\n\
         Use three sentences maximum and keep the answer concise.\n\n\
         Answer:"
    ));
    prompt
}

pub fn rewrite_input(question: &str) -> String {
    format!("Here is the initial question: \n\n {question} \n\n Formulate an improved question.")
}
