//! The stages of the control loop.
//!
//! Each stage receives its collaborators at construction time and holds no
//! per-question state: a single stage instance can serve any number of
//! concurrent loops.
//!
//! | Stage | Collaborator | Reads | Produces |
//! |---|---|---|---|
//! | [`Router`] | judgment service | question | route decision |
//! | [`Retriever`] | evidence store | question | fresh evidence set |
//! | [`RelevanceFilter`] | judgment service | question, evidence | filtered set, fallback flag |
//! | [`WebFallback`] | web search | question, evidence | evidence with one web passage appended |
//! | [`Generator`] | judgment service | question, evidence, history | draft answer |
//! | [`AnswerGrader`] | judgment service | question, evidence, draft | verdict |
//! | [`QuestionRewriter`] | judgment service | question | rewritten question |

mod generation;
mod quality;
mod relevance;
mod retrieval;
mod rewrite;
mod router;
mod web;

pub use generation::Generator;
pub use quality::{AnswerGrader, Grades};
pub use relevance::{FilterOutcome, RelevanceFilter};
pub use retrieval::Retriever;
pub use rewrite::QuestionRewriter;
pub use router::Router;
pub use web::WebFallback;
