//! Usefulness and exhaustiveness of pattern matrices.
//!
//! The analysis follows Maranget's algorithm: a matrix of equal-width
//! pattern vectors is repeatedly specialized against constructor heads or
//! reduced to its default matrix, until the question "can this vector
//! match something no earlier row matches" becomes trivial. Witnesses of
//! incompleteness are reconstructed on the way back up, one column at a
//! time.

use merl_core::ast::{Lit, Pat};
use merl_core::hash::VcHash;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A literal drawn from an order-enumerable infinite domain. No finite
/// set of these can cover the domain, so any column headed by them is
/// incomplete by construction.
#[derive(Debug, Clone)]
pub enum InfLit {
    Int(i64),
    Word(u64),
    Double(f64),
    Text(String),
}

impl InfLit {
    /// A value guaranteed to differ from `self`. Not a semantic successor:
    /// it only has to escape a finite set after enough applications, which
    /// is all witness synthesis needs.
    fn succ(&self) -> InfLit {
        match self {
            InfLit::Int(n) => InfLit::Int(n.wrapping_add(1)),
            InfLit::Word(w) => InfLit::Word(w.wrapping_add(1)),
            InfLit::Double(d) => InfLit::Double(d + 1.0),
            InfLit::Text(s) => {
                if s.is_empty() {
                    InfLit::Text("a".to_string())
                } else {
                    // String doubling escapes any finite set by length
                    InfLit::Text(format!("{}{}", s, s))
                }
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            InfLit::Int(_) => 0,
            InfLit::Word(_) => 1,
            InfLit::Double(_) => 2,
            InfLit::Text(_) => 3,
        }
    }
}

impl PartialEq for InfLit {
    fn eq(&self, other: &InfLit) -> bool {
        match (self, other) {
            (InfLit::Int(a), InfLit::Int(b)) => a == b,
            (InfLit::Word(a), InfLit::Word(b)) => a == b,
            // Bit equality keeps the set semantics total for doubles
            (InfLit::Double(a), InfLit::Double(b)) => a.to_bits() == b.to_bits(),
            (InfLit::Text(a), InfLit::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for InfLit {}

impl Ord for InfLit {
    fn cmp(&self, other: &InfLit) -> Ordering {
        match (self, other) {
            (InfLit::Int(a), InfLit::Int(b)) => a.cmp(b),
            (InfLit::Word(a), InfLit::Word(b)) => a.cmp(b),
            (InfLit::Double(a), InfLit::Double(b)) => a.total_cmp(b),
            (InfLit::Text(a), InfLit::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for InfLit {
    fn partial_cmp(&self, other: &InfLit) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A generalized pattern constructor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Con {
    /// `Some _` (one sub-pattern)
    One,
    /// `None`
    Empty,
    /// Tuple of the given arity, the only constructor of its type
    Tuple(usize),
    /// Enum constructor: owning enum's address plus the tag
    Enum(VcHash, String),
    /// Literal from an infinite domain
    Inf(InfLit),
}

impl Con {
    /// Number of sub-patterns this constructor carries.
    pub fn arity(&self) -> usize {
        match self {
            Con::One => 1,
            Con::Tuple(n) => *n,
            Con::Empty | Con::Enum(_, _) | Con::Inf(_) => 0,
        }
    }
}

/// A pattern in the analyzer's lattice: a wildcard or a constructor
/// applied to sub-patterns. Binders have already been erased; only shape
/// matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPat {
    Wild,
    Con(Con, Vec<MatchPat>),
}

impl MatchPat {
    pub fn con(c: Con) -> MatchPat {
        let subs = vec![MatchPat::Wild; c.arity()];
        MatchPat::Con(c, subs)
    }
}

impl fmt::Display for MatchPat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPat::Wild => write!(f, "_"),
            MatchPat::Con(Con::One, subs) => write!(f, "Some {}", subs[0]),
            MatchPat::Con(Con::Empty, _) => write!(f, "None"),
            MatchPat::Con(Con::Tuple(_), subs) => {
                write!(f, "(")?;
                for (i, p) in subs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            MatchPat::Con(Con::Enum(_, tag), _) => write!(f, "#{}", tag),
            MatchPat::Con(Con::Inf(lit), _) => match lit {
                InfLit::Int(n) => write!(f, "{}", n),
                InfLit::Word(w) => write!(f, "0x{:x}", w),
                InfLit::Double(d) => write!(f, "{}", d),
                InfLit::Text(s) => write!(f, "{:?}", s),
            },
        }
    }
}

/// Full constructor signatures of the enums in scope, keyed by the owning
/// enum's address.
#[derive(Debug, Clone, Default)]
pub struct EnumSigs {
    sigs: HashMap<VcHash, BTreeSet<(VcHash, String)>>,
}

impl EnumSigs {
    pub fn new() -> EnumSigs {
        EnumSigs::default()
    }

    pub fn insert(&mut self, owner: VcHash, constructors: impl IntoIterator<Item = String>) {
        let set = constructors
            .into_iter()
            .map(|tag| (owner, tag))
            .collect::<BTreeSet<_>>();
        self.sigs.insert(owner, set);
    }

    fn full_set(&self, owner: &VcHash) -> Option<&BTreeSet<(VcHash, String)>> {
        self.sigs.get(owner)
    }
}

/// Outcome of checking a head-column constructor set against its type.
enum Signature {
    Complete,
    /// A head pattern no row's head can match
    Incomplete(MatchPat),
}

/// Heads of the first column.
fn col(matrix: &[Vec<MatchPat>]) -> Vec<&MatchPat> {
    matrix.iter().map(|row| &row[0]).collect()
}

/// The set of constructors mentioned by a list of head patterns.
fn con_names(heads: &[&MatchPat]) -> BTreeSet<Con> {
    heads
        .iter()
        .filter_map(|p| match p {
            MatchPat::Wild => None,
            MatchPat::Con(c, _) => Some(c.clone()),
        })
        .collect()
}

/// Specialize a matrix for constructor `c`: keep the rows whose head can
/// match `c`, replacing the head by its sub-patterns.
fn specialize(c: &Con, matrix: &[Vec<MatchPat>]) -> Vec<Vec<MatchPat>> {
    let mut out = Vec::new();
    for row in matrix {
        match &row[0] {
            MatchPat::Wild => {
                let mut new_row = vec![MatchPat::Wild; c.arity()];
                new_row.extend_from_slice(&row[1..]);
                out.push(new_row);
            }
            MatchPat::Con(c2, subs) if c2 == c => {
                let mut new_row = subs.clone();
                new_row.extend_from_slice(&row[1..]);
                out.push(new_row);
            }
            MatchPat::Con(_, _) => {}
        }
    }
    out
}

/// Specialize a single vector (used for the candidate `q`).
fn specialize_row(c: &Con, row: &[MatchPat]) -> Vec<MatchPat> {
    match &row[0] {
        MatchPat::Wild => {
            let mut out = vec![MatchPat::Wild; c.arity()];
            out.extend_from_slice(&row[1..]);
            out
        }
        MatchPat::Con(_, subs) => {
            let mut out = subs.clone();
            out.extend_from_slice(&row[1..]);
            out
        }
    }
}

/// Drop constructor-headed rows and strip the head wildcard from the rest.
fn default_matrix(matrix: &[Vec<MatchPat>]) -> Vec<Vec<MatchPat>> {
    matrix
        .iter()
        .filter_map(|row| match &row[0] {
            MatchPat::Wild => Some(row[1..].to_vec()),
            MatchPat::Con(_, _) => None,
        })
        .collect()
}

/// Decide whether `cons` covers every value of its column's type, and if
/// not, produce a head pattern none of them matches.
fn complete_signature(sigs: &EnumSigs, cons: &BTreeSet<Con>) -> Signature {
    if cons.is_empty() {
        return Signature::Incomplete(MatchPat::Wild);
    }

    // Tuples are the sole constructor of their type
    if cons.iter().any(|c| matches!(c, Con::Tuple(_))) {
        return Signature::Complete;
    }

    let has_one = cons.contains(&Con::One);
    let has_empty = cons.contains(&Con::Empty);
    if has_one || has_empty {
        return if has_one && has_empty {
            Signature::Complete
        } else if has_one {
            Signature::Incomplete(MatchPat::con(Con::Empty))
        } else {
            Signature::Incomplete(MatchPat::con(Con::One))
        };
    }

    if let Some(Con::Enum(owner, _)) = cons.iter().find(|c| matches!(c, Con::Enum(_, _))) {
        let seen: BTreeSet<(VcHash, String)> = cons
            .iter()
            .filter_map(|c| match c {
                Con::Enum(h, tag) => Some((*h, tag.clone())),
                _ => None,
            })
            .collect();
        return match sigs.full_set(owner) {
            Some(full) if *full == seen => Signature::Complete,
            Some(full) => match full.difference(&seen).next() {
                Some((h, tag)) => {
                    Signature::Incomplete(MatchPat::con(Con::Enum(*h, tag.clone())))
                }
                // difference is non-empty unless the sets are equal
                None => Signature::Complete,
            },
            // Unknown enum: assume more constructors exist
            None => Signature::Incomplete(MatchPat::Wild),
        };
    }

    // Infinite domains are never covered; synthesize a fresh literal by
    // iterating the successor past everything already seen.
    let seen: BTreeSet<InfLit> = cons
        .iter()
        .filter_map(|c| match c {
            Con::Inf(lit) => Some(lit.clone()),
            _ => None,
        })
        .collect();
    let mut candidate = seen
        .iter()
        .next()
        .map(InfLit::succ)
        .unwrap_or(InfLit::Int(0));
    while seen.contains(&candidate) {
        candidate = candidate.succ();
    }
    Signature::Incomplete(MatchPat::con(Con::Inf(candidate)))
}

/// Whether `q` can match a value that no row of `matrix` matches.
///
/// Adding rows to `matrix` can only turn the answer from `true` to
/// `false`, never back.
pub fn is_useful(sigs: &EnumSigs, matrix: &[Vec<MatchPat>], q: &[MatchPat]) -> bool {
    if matrix.is_empty() {
        return true;
    }
    if q.is_empty() {
        // Zero-width matrix with at least one row covers the one value
        return false;
    }
    match &q[0] {
        MatchPat::Con(c, _) => {
            let spec = specialize(c, matrix);
            let spec_q = specialize_row(c, q);
            is_useful(sigs, &spec, &spec_q)
        }
        MatchPat::Wild => {
            let sigma = con_names(&col(matrix));
            match complete_signature(sigs, &sigma) {
                Signature::Complete => sigma.iter().any(|c| {
                    let spec = specialize(c, matrix);
                    let spec_q = specialize_row(c, q);
                    is_useful(sigs, &spec, &spec_q)
                }),
                Signature::Incomplete(_) => {
                    is_useful(sigs, &default_matrix(matrix), &q[1..])
                }
            }
        }
    }
}

/// Prove a matrix exhaustive or produce a vector of the original width
/// that no row matches.
pub fn exhaustive(
    sigs: &EnumSigs,
    matrix: &[Vec<MatchPat>],
    width: usize,
) -> Option<Vec<MatchPat>> {
    if width == 0 {
        return if matrix.is_empty() { Some(Vec::new()) } else { None };
    }
    let sigma = con_names(&col(matrix));
    match complete_signature(sigs, &sigma) {
        Signature::Complete => {
            for c in &sigma {
                let arity = c.arity();
                if let Some(witness) = exhaustive(sigs, &specialize(c, matrix), arity + width - 1)
                {
                    // Fold the sub-pattern positions back under `c`
                    let subs = witness[..arity].to_vec();
                    let mut out = vec![MatchPat::Con(c.clone(), subs)];
                    out.extend_from_slice(&witness[arity..]);
                    return Some(out);
                }
            }
            None
        }
        Signature::Incomplete(head) => {
            exhaustive(sigs, &default_matrix(matrix), width - 1).map(|rest| {
                let mut out = vec![head];
                out.extend(rest);
                out
            })
        }
    }
}

/// A row that adds nothing to the rows before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundantRow {
    /// Index of the redundant row
    pub row: usize,
    /// Index of the earliest prefix of rows that already covers it
    pub covered_by: usize,
}

/// Report every row that is not useful given the rows above it, together
/// with the earliest row at which coverage became total.
pub fn check_usefulness(sigs: &EnumSigs, matrix: &[Vec<MatchPat>]) -> Vec<RedundantRow> {
    let mut out = Vec::new();
    for i in 0..matrix.len() {
        if !is_useful(sigs, &matrix[..i], &matrix[i]) {
            let covered_by = (0..i)
                .find(|j| !is_useful(sigs, &matrix[..=*j], &matrix[i]))
                .unwrap_or(0);
            out.push(RedundantRow { row: i, covered_by });
        }
    }
    out
}

/// Error for a surface pattern whose enum constructor was never resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpinnedEnum {
    pub tag: String,
}

impl fmt::Display for UnpinnedEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enum pattern #{} has no resolved owner", self.tag)
    }
}

impl std::error::Error for UnpinnedEnum {}

/// Lower a surface pattern into the analyzer's lattice.
pub fn lower_pattern(pat: &Pat) -> Result<MatchPat, UnpinnedEnum> {
    Ok(match pat {
        Pat::Var(_) => MatchPat::Wild,
        Pat::Lit(Lit::Int(n)) => MatchPat::con(Con::Inf(InfLit::Int(*n))),
        Pat::Lit(Lit::Hex(w)) => MatchPat::con(Con::Inf(InfLit::Word(*w))),
        Pat::Lit(Lit::Double(d)) => MatchPat::con(Con::Inf(InfLit::Double(*d))),
        Pat::Lit(Lit::Text(s)) => MatchPat::con(Con::Inf(InfLit::Text(s.clone()))),
        Pat::Enum(pinned, tag) => match pinned.hash() {
            Some(owner) => MatchPat::con(Con::Enum(owner, tag.clone())),
            None => return Err(UnpinnedEnum { tag: tag.clone() }),
        },
        Pat::One(inner) => MatchPat::Con(Con::One, vec![lower_pattern(inner)?]),
        Pat::Empty => MatchPat::con(Con::Empty),
        Pat::Tuple(items) => {
            let subs = items
                .iter()
                .map(lower_pattern)
                .collect::<Result<Vec<_>, _>>()?;
            MatchPat::Con(Con::Tuple(subs.len()), subs)
        }
    })
}

/// Result of analyzing the arms of one `case` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseAnalysis {
    /// A pattern no arm matches, if any
    pub missing: Option<MatchPat>,
    /// Arms shadowed by earlier arms
    pub redundant: Vec<RedundantRow>,
}

/// Analyze a `case` expression's arm patterns for coverage and overlap.
pub fn check_case(sigs: &EnumSigs, arms: &[Pat]) -> Result<CaseAnalysis, UnpinnedEnum> {
    let matrix = arms
        .iter()
        .map(|p| Ok(vec![lower_pattern(p)?]))
        .collect::<Result<Vec<_>, UnpinnedEnum>>()?;
    let missing = exhaustive(sigs, &matrix, 1).map(|mut w| w.remove(0));
    let redundant = check_usefulness(sigs, &matrix);
    Ok(CaseAnalysis { missing, redundant })
}
