//! Static analysis of Merl pattern matrices.
//!
//! Decides whether a `case` expression covers every value of its
//! scrutinee's type and which arms are shadowed by earlier arms, and
//! synthesizes a concrete witness whenever coverage fails.

pub mod exhaustiveness;

pub use exhaustiveness::{
    CaseAnalysis, Con, EnumSigs, InfLit, MatchPat, RedundantRow, UnpinnedEnum, check_case,
    check_usefulness, exhaustive, is_useful, lower_pattern,
};
