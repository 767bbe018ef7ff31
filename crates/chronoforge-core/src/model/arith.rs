//! Integer, float and boolean expressions, comparisons and presence.

use super::handles::{
    BoolExpr, BoolOperand, FloatExpr, FloatOperand, IntExpr, IntOperand, Node,
};
use super::node::{Arg, Func, NodeData, NodeId};
use super::{finite, Model};
use crate::error::Result;

impl Model {
    fn nodes_of(ids: &[NodeId]) -> Vec<Arg> {
        ids.iter().map(|id| Arg::Node(*id)).collect()
    }

    fn int_binary(&mut self, func: Func, a: IntOperand, b: IntOperand) -> Result<IntExpr> {
        let a = self.int_operand(a)?;
        let b = self.int_operand(b)?;
        self.add(NodeData::new(func, Self::nodes_of(&[a, b])))
            .map(IntExpr)
    }

    fn int_unary(&mut self, func: Func, a: IntOperand) -> Result<IntExpr> {
        let a = self.int_operand(a)?;
        self.add(NodeData::new(func, Self::nodes_of(&[a]))).map(IntExpr)
    }

    fn int_aggregate<I, T>(&mut self, func: Func, items: I) -> Result<IntExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<IntOperand>,
    {
        let mut list = Vec::new();
        for item in items {
            list.push(Arg::Node(self.int_operand(item.into())?));
        }
        self.add(NodeData::new(func, vec![Arg::List(list)]))
            .map(IntExpr)
    }

    fn float_binary(&mut self, func: Func, a: FloatOperand, b: FloatOperand) -> Result<FloatExpr> {
        let a = self.float_operand(a)?;
        let b = self.float_operand(b)?;
        self.add(NodeData::new(func, Self::nodes_of(&[a, b])))
            .map(FloatExpr)
    }

    fn float_unary(&mut self, func: Func, a: FloatOperand) -> Result<FloatExpr> {
        let a = self.float_operand(a)?;
        self.add(NodeData::new(func, Self::nodes_of(&[a])))
            .map(FloatExpr)
    }

    fn float_aggregate<I, T>(&mut self, func: Func, items: I) -> Result<FloatExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<FloatOperand>,
    {
        let mut list = Vec::new();
        for item in items {
            list.push(Arg::Node(self.float_operand(item.into())?));
        }
        self.add(NodeData::new(func, vec![Arg::List(list)]))
            .map(FloatExpr)
    }

    fn compare(&mut self, func: Func, a: FloatOperand, b: FloatOperand) -> Result<BoolExpr> {
        let a = self.float_operand(a)?;
        let b = self.float_operand(b)?;
        self.add(NodeData::new(func, Self::nodes_of(&[a, b])))
            .map(BoolExpr)
    }

    fn bool_binary(&mut self, func: Func, a: BoolOperand, b: BoolOperand) -> Result<BoolExpr> {
        let a = self.bool_operand(a)?;
        let b = self.bool_operand(b)?;
        self.add(NodeData::new(func, Self::nodes_of(&[a, b])))
            .map(BoolExpr)
    }

    // ========================================================================
    // Integer arithmetic
    // ========================================================================

    pub fn plus(&mut self, a: impl Into<IntOperand>, b: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_binary(Func::IntPlus, a.into(), b.into())
    }

    pub fn minus(&mut self, a: impl Into<IntOperand>, b: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_binary(Func::IntMinus, a.into(), b.into())
    }

    pub fn times(&mut self, a: impl Into<IntOperand>, b: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_binary(Func::IntTimes, a.into(), b.into())
    }

    /// Integer division, truncating toward zero. Division by zero is absent.
    pub fn div(&mut self, a: impl Into<IntOperand>, b: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_binary(Func::IntDiv, a.into(), b.into())
    }

    pub fn neg(&mut self, a: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_unary(Func::IntNeg, a.into())
    }

    pub fn abs(&mut self, a: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_unary(Func::IntAbs, a.into())
    }

    /// Smaller of two values; absent if either is absent.
    pub fn min2(&mut self, a: impl Into<IntOperand>, b: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_binary(Func::IntMin2, a.into(), b.into())
    }

    /// Larger of two values; absent if either is absent.
    pub fn max2(&mut self, a: impl Into<IntOperand>, b: impl Into<IntOperand>) -> Result<IntExpr> {
        self.int_binary(Func::IntMax2, a.into(), b.into())
    }

    /// Sum of the present operands. The empty sum is 0.
    pub fn sum<I, T>(&mut self, items: I) -> Result<IntExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<IntOperand>,
    {
        self.int_aggregate(Func::IntSum, items)
    }

    /// Minimum of the present operands; absent when none is present.
    pub fn min<I, T>(&mut self, items: I) -> Result<IntExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<IntOperand>,
    {
        self.int_aggregate(Func::IntMin, items)
    }

    /// Maximum of the present operands; absent when none is present.
    pub fn max<I, T>(&mut self, items: I) -> Result<IntExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<IntOperand>,
    {
        self.int_aggregate(Func::IntMax, items)
    }

    /// `expr` when present, otherwise `default`. Never absent.
    pub fn guard(&mut self, expr: impl Into<IntOperand>, default: i64) -> Result<IntExpr> {
        let expr = self.int_operand(expr.into())?;
        self.add(NodeData::new(
            Func::IntGuard,
            vec![Arg::Node(expr), Arg::Int(default)],
        ))
        .map(IntExpr)
    }

    // ========================================================================
    // Float arithmetic
    // ========================================================================

    pub fn float_plus(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<FloatExpr> {
        self.float_binary(Func::FloatPlus, a.into(), b.into())
    }

    pub fn float_minus(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<FloatExpr> {
        self.float_binary(Func::FloatMinus, a.into(), b.into())
    }

    pub fn float_times(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<FloatExpr> {
        self.float_binary(Func::FloatTimes, a.into(), b.into())
    }

    pub fn float_div(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<FloatExpr> {
        self.float_binary(Func::FloatDiv, a.into(), b.into())
    }

    pub fn float_neg(&mut self, a: impl Into<FloatOperand>) -> Result<FloatExpr> {
        self.float_unary(Func::FloatNeg, a.into())
    }

    pub fn float_abs(&mut self, a: impl Into<FloatOperand>) -> Result<FloatExpr> {
        self.float_unary(Func::FloatAbs, a.into())
    }

    pub fn float_min2(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<FloatExpr> {
        self.float_binary(Func::FloatMin2, a.into(), b.into())
    }

    pub fn float_max2(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<FloatExpr> {
        self.float_binary(Func::FloatMax2, a.into(), b.into())
    }

    pub fn float_sum<I, T>(&mut self, items: I) -> Result<FloatExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<FloatOperand>,
    {
        self.float_aggregate(Func::FloatSum, items)
    }

    pub fn float_min<I, T>(&mut self, items: I) -> Result<FloatExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<FloatOperand>,
    {
        self.float_aggregate(Func::FloatMin, items)
    }

    pub fn float_max<I, T>(&mut self, items: I) -> Result<FloatExpr>
    where
        I: IntoIterator<Item = T>,
        T: Into<FloatOperand>,
    {
        self.float_aggregate(Func::FloatMax, items)
    }

    pub fn float_guard(&mut self, expr: impl Into<FloatOperand>, default: f64) -> Result<FloatExpr> {
        let default = finite("floatGuard", default)?;
        let expr = self.float_operand(expr.into())?;
        self.add(NodeData::new(
            Func::FloatGuard,
            vec![Arg::Node(expr), Arg::Float(default)],
        ))
        .map(FloatExpr)
    }

    // ========================================================================
    // Presence and comparisons
    // ========================================================================

    /// True when the operand is present, false when absent. Never absent.
    pub fn presence(&mut self, node: impl Node) -> Result<BoolExpr> {
        let id = node.node();
        self.node(id)?;
        self.add(NodeData::new(Func::Presence, vec![Arg::Node(id)]))
            .map(BoolExpr)
    }

    /// Equal values and equal presence. Never absent.
    pub fn identity(
        &mut self,
        a: impl Into<FloatOperand>,
        b: impl Into<FloatOperand>,
    ) -> Result<BoolExpr> {
        self.compare(Func::Identity, a.into(), b.into())
    }

    pub fn eq(&mut self, a: impl Into<FloatOperand>, b: impl Into<FloatOperand>) -> Result<BoolExpr> {
        self.compare(Func::Eq, a.into(), b.into())
    }

    pub fn ne(&mut self, a: impl Into<FloatOperand>, b: impl Into<FloatOperand>) -> Result<BoolExpr> {
        self.compare(Func::Ne, a.into(), b.into())
    }

    pub fn lt(&mut self, a: impl Into<FloatOperand>, b: impl Into<FloatOperand>) -> Result<BoolExpr> {
        self.compare(Func::Lt, a.into(), b.into())
    }

    pub fn le(&mut self, a: impl Into<FloatOperand>, b: impl Into<FloatOperand>) -> Result<BoolExpr> {
        self.compare(Func::Le, a.into(), b.into())
    }

    pub fn gt(&mut self, a: impl Into<FloatOperand>, b: impl Into<FloatOperand>) -> Result<BoolExpr> {
        self.compare(Func::Gt, a.into(), b.into())
    }

    pub fn ge(&mut self, a: impl Into<FloatOperand>, b: impl Into<FloatOperand>) -> Result<BoolExpr> {
        self.compare(Func::Ge, a.into(), b.into())
    }

    /// `lb <= expr <= ub`.
    pub fn in_range(&mut self, expr: impl Into<FloatOperand>, lb: f64, ub: f64) -> Result<BoolExpr> {
        let lb = finite("inRange", lb)?;
        let ub = finite("inRange", ub)?;
        let expr = self.float_operand(expr.into())?;
        self.add(NodeData::new(
            Func::InRange,
            vec![Arg::Node(expr), Arg::Float(lb), Arg::Float(ub)],
        ))
        .map(BoolExpr)
    }

    // ========================================================================
    // Booleans
    // ========================================================================

    pub fn and(&mut self, a: impl Into<BoolOperand>, b: impl Into<BoolOperand>) -> Result<BoolExpr> {
        self.bool_binary(Func::BoolAnd, a.into(), b.into())
    }

    pub fn or(&mut self, a: impl Into<BoolOperand>, b: impl Into<BoolOperand>) -> Result<BoolExpr> {
        self.bool_binary(Func::BoolOr, a.into(), b.into())
    }

    pub fn not(&mut self, a: impl Into<BoolOperand>) -> Result<BoolExpr> {
        let a = self.bool_operand(a.into())?;
        self.add(NodeData::new(Func::BoolNot, vec![Arg::Node(a)]))
            .map(BoolExpr)
    }

    pub fn implies(
        &mut self,
        a: impl Into<BoolOperand>,
        b: impl Into<BoolOperand>,
    ) -> Result<BoolExpr> {
        self.bool_binary(Func::BoolImplies, a.into(), b.into())
    }
}
