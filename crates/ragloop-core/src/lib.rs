//! # ragloop-core
//!
//! Deterministic data model and policy for the adaptive
//! retrieval-and-generation loop.
//!
//! This crate answers, without any I/O:
//! - What does the loop carry from stage to stage?
//! - Which stage comes next?
//! - When is an answer accepted, retried, or given up on?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same judgments always produce the same transitions
//! 2. **No model calls**: Judgments arrive as closed enumerations
//! 3. **Bounded**: Every loop terminates within a transition budget derived
//!    from `max_retries`
//! 4. **No aliasing**: Evidence sets are replaced wholesale, never shared
//!
//! ## Example
//!
//! ```rust
//! use ragloop_core::{machine, GroundingVerdict, LoopState, QualityGate, Question, Stage,
//!     UsefulnessVerdict, Verdict};
//!
//! let mut state = LoopState::new(Question::new("What was Q4 net income?"), 3);
//! state.record_generation("Net income was $5.2B.");
//!
//! let verdict = QualityGate::new().decide(
//!     state.budget_exhausted(),
//!     Some(GroundingVerdict::Grounded),
//!     Some(UsefulnessVerdict::Useful),
//! );
//! assert_eq!(verdict, Verdict::UsefulAndGrounded);
//! assert_eq!(machine::after_grading(verdict), Stage::Done);
//! ```

pub mod evidence;
pub mod judgment;
pub mod machine;
pub mod question;
pub mod state;
pub mod verdict;

// Re-export main types at crate root
pub use evidence::{EvidencePassage, EvidenceSet, PassageSource};
pub use judgment::{
    Decision, GroundingVerdict, Judgment, JudgmentKind, RelevanceVerdict, RouteDecision,
    UnknownToken, UsefulnessVerdict,
};
pub use machine::{Stage, TransitionGuard};
pub use question::{Question, Role, Turn};
pub use state::{LoopSnapshot, LoopState, StateError};
pub use verdict::{QualityGate, Verdict};
