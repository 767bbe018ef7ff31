//! Interval accessors, precedences and interval structure constraints.

use super::handles::{Constraint, IntExpr, IntOperand, IntervalVar, SequenceVar};
use super::node::{Arg, Func, Kind, NodeData, NodeId};
use super::Model;
use crate::error::{ModelError, Result};

/// Which endpoints a precedence relates, and whether it is an equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrecedenceKind {
    EndBeforeStart,
    EndBeforeEnd,
    StartBeforeStart,
    StartBeforeEnd,
    EndAtStart,
    EndAtEnd,
    StartAtStart,
    StartAtEnd,
}

impl PrecedenceKind {
    pub const ALL: [PrecedenceKind; 8] = [
        PrecedenceKind::EndBeforeStart,
        PrecedenceKind::EndBeforeEnd,
        PrecedenceKind::StartBeforeStart,
        PrecedenceKind::StartBeforeEnd,
        PrecedenceKind::EndAtStart,
        PrecedenceKind::EndAtEnd,
        PrecedenceKind::StartAtStart,
        PrecedenceKind::StartAtEnd,
    ];

    pub fn func(self) -> Func {
        match self {
            PrecedenceKind::EndBeforeStart => Func::EndBeforeStart,
            PrecedenceKind::EndBeforeEnd => Func::EndBeforeEnd,
            PrecedenceKind::StartBeforeStart => Func::StartBeforeStart,
            PrecedenceKind::StartBeforeEnd => Func::StartBeforeEnd,
            PrecedenceKind::EndAtStart => Func::EndAtStart,
            PrecedenceKind::EndAtEnd => Func::EndAtEnd,
            PrecedenceKind::StartAtStart => Func::StartAtStart,
            PrecedenceKind::StartAtEnd => Func::StartAtEnd,
        }
    }

    pub fn from_func(func: Func) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.func() == func)
    }

    /// Whether the predecessor's end (rather than start) is constrained.
    pub fn uses_end_of_first(self) -> bool {
        matches!(
            self,
            PrecedenceKind::EndBeforeStart
                | PrecedenceKind::EndBeforeEnd
                | PrecedenceKind::EndAtStart
                | PrecedenceKind::EndAtEnd
        )
    }

    /// Whether the successor's end (rather than start) is constrained.
    pub fn uses_end_of_second(self) -> bool {
        matches!(
            self,
            PrecedenceKind::EndBeforeEnd
                | PrecedenceKind::StartBeforeEnd
                | PrecedenceKind::EndAtEnd
                | PrecedenceKind::StartAtEnd
        )
    }

    /// Equality (`*At*`) rather than inequality (`*Before*`).
    pub fn is_equality(self) -> bool {
        matches!(
            self,
            PrecedenceKind::EndAtStart
                | PrecedenceKind::EndAtEnd
                | PrecedenceKind::StartAtStart
                | PrecedenceKind::StartAtEnd
        )
    }
}

/// Checks that a transition matrix is `size` x `size` with no negative entry.
pub(crate) fn check_transitions(matrix: &[Vec<i64>], size: usize) -> Result<()> {
    if matrix.len() != size {
        return Err(ModelError::TransitionShape {
            expected: size,
            detail: format!("found {} rows", matrix.len()),
        });
    }
    for (row, values) in matrix.iter().enumerate() {
        if values.len() != size {
            return Err(ModelError::TransitionShape {
                expected: size,
                detail: format!("row {row} has {} columns", values.len()),
            });
        }
        if let Some((col, value)) = values.iter().enumerate().find(|(_, v)| **v < 0) {
            return Err(ModelError::NegativeTransition {
                row,
                col,
                value: *value,
            });
        }
    }
    Ok(())
}

impl Model {
    fn expect_interval(&self, id: NodeId) -> Result<()> {
        self.expect_kind(id, "interval variable", |k| k == Kind::Interval)
    }

    fn interval_list(&self, intervals: &[IntervalVar]) -> Result<Arg> {
        for iv in intervals {
            self.expect_interval(iv.0)?;
        }
        Ok(Arg::List(intervals.iter().map(|iv| Arg::Node(iv.0)).collect()))
    }

    fn accessor(&mut self, func: Func, iv: IntervalVar, default: Option<i64>) -> Result<IntExpr> {
        self.expect_interval(iv.0)?;
        let mut args = vec![Arg::Node(iv.0)];
        args.extend(default.map(Arg::Int));
        self.add(NodeData::new(func, args)).map(IntExpr)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn start(&mut self, iv: IntervalVar) -> Result<IntExpr> {
        self.accessor(Func::StartOf, iv, None)
    }

    pub fn end(&mut self, iv: IntervalVar) -> Result<IntExpr> {
        self.accessor(Func::EndOf, iv, None)
    }

    pub fn length(&mut self, iv: IntervalVar) -> Result<IntExpr> {
        self.accessor(Func::LengthOf, iv, None)
    }

    /// Start when present, otherwise `default`.
    pub fn start_or(&mut self, iv: IntervalVar, default: i64) -> Result<IntExpr> {
        self.accessor(Func::StartOr, iv, Some(default))
    }

    pub fn end_or(&mut self, iv: IntervalVar, default: i64) -> Result<IntExpr> {
        self.accessor(Func::EndOr, iv, Some(default))
    }

    pub fn length_or(&mut self, iv: IntervalVar, default: i64) -> Result<IntExpr> {
        self.accessor(Func::LengthOr, iv, Some(default))
    }

    // ========================================================================
    // Precedences
    // ========================================================================

    /// Relates an endpoint of `a` to an endpoint of `b` with a delay.
    ///
    /// Satisfied when either interval is absent.
    pub fn precedence(
        &mut self,
        kind: PrecedenceKind,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.expect_interval(a.0)?;
        self.expect_interval(b.0)?;
        let delay = self.int_arg(delay.into())?;
        let mut args = vec![Arg::Node(a.0), Arg::Node(b.0)];
        if delay != Arg::Int(0) {
            args.push(delay);
        }
        self.add(NodeData::new(kind.func(), args)).map(Constraint)
    }

    pub fn end_before_start(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::EndBeforeStart, a, b, delay)
    }

    pub fn end_before_end(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::EndBeforeEnd, a, b, delay)
    }

    pub fn start_before_start(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::StartBeforeStart, a, b, delay)
    }

    pub fn start_before_end(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::StartBeforeEnd, a, b, delay)
    }

    pub fn end_at_start(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::EndAtStart, a, b, delay)
    }

    pub fn end_at_end(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::EndAtEnd, a, b, delay)
    }

    pub fn start_at_start(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::StartAtStart, a, b, delay)
    }

    pub fn start_at_end(
        &mut self,
        a: IntervalVar,
        b: IntervalVar,
        delay: impl Into<IntOperand>,
    ) -> Result<Constraint> {
        self.precedence(PrecedenceKind::StartAtEnd, a, b, delay)
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// `main` is present iff exactly one option is, and matches it exactly.
    pub fn alternative(&mut self, main: IntervalVar, options: &[IntervalVar]) -> Result<Constraint> {
        self.expect_interval(main.0)?;
        let options = self.interval_list(options)?;
        self.add(NodeData::new(
            Func::Alternative,
            vec![Arg::Node(main.0), options],
        ))
        .map(Constraint)
    }

    /// `main` spans exactly the present covered intervals.
    pub fn span(&mut self, main: IntervalVar, covered: &[IntervalVar]) -> Result<Constraint> {
        self.expect_interval(main.0)?;
        let covered = self.interval_list(covered)?;
        self.add(NodeData::new(Func::Span, vec![Arg::Node(main.0), covered]))
            .map(Constraint)
    }

    /// Present intervals do not overlap.
    ///
    /// `transitions[i][j]` is the minimum gap when interval `i` precedes
    /// interval `j`; it applies to every pair.
    pub fn no_overlap(
        &mut self,
        intervals: &[IntervalVar],
        transitions: Option<Vec<Vec<i64>>>,
    ) -> Result<Constraint> {
        let list = self.interval_list(intervals)?;
        if let Some(matrix) = &transitions {
            check_transitions(matrix, intervals.len())?;
        }
        let mut data = NodeData::new(Func::NoOverlap, vec![list]);
        data.values = transitions;
        self.add(data).map(Constraint)
    }

    /// No-overlap over a sequence variable.
    ///
    /// With types on the sequence the matrix is indexed by type, otherwise by
    /// interval position.
    pub fn no_overlap_sequence(
        &mut self,
        sequence: SequenceVar,
        transitions: Option<Vec<Vec<i64>>>,
    ) -> Result<Constraint> {
        let seq = self.node(sequence.0)?;
        if seq.func != Func::SequenceVar {
            return Err(ModelError::KindMismatch {
                node: sequence.0,
                expected: "sequence variable",
                actual: seq.kind().name(),
            });
        }
        let size = sequence_transition_size(seq);
        if let Some(matrix) = &transitions {
            check_transitions(matrix, size)?;
        }
        let mut data = NodeData::new(Func::NoOverlap, vec![Arg::Node(sequence.0)]);
        data.values = transitions;
        self.add(data).map(Constraint)
    }
}

/// Matrix size expected for a sequence: number of types or of intervals.
pub(crate) fn sequence_transition_size(seq: &NodeData) -> usize {
    match seq.values.as_ref().and_then(|v| v.first()) {
        Some(types) => types.iter().max().map_or(0, |t| *t as usize + 1),
        None => seq
            .args
            .first()
            .and_then(Arg::as_list)
            .map_or(0, <[Arg]>::len),
    }
}
