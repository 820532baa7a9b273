//! Convenience constructors for expression trees

use crate::{Agg, BinaryOp, DataType, Expr, Func, Op, Schema, Value};

impl Expr {
    pub fn new(op: Op, dtype: DataType) -> Self {
        Self {
            op,
            dtype,
            name: None,
        }
    }

    pub fn literal(value: impl Into<Value>, dtype: DataType) -> Self {
        Self::new(
            Op::Literal {
                value: value.into(),
            },
            dtype,
        )
    }

    /// Typed NULL
    pub fn null(dtype: DataType) -> Self {
        Self::new(Op::Literal { value: Value::Null }, dtype)
    }

    pub fn column(name: impl Into<String>, dtype: DataType) -> Self {
        Self::new(
            Op::Column {
                name: name.into(),
                table: None,
            },
            dtype,
        )
    }

    /// Column bound to a named table
    pub fn column_of(table: impl Into<String>, name: impl Into<String>, dtype: DataType) -> Self {
        Self::new(
            Op::Column {
                name: name.into(),
                table: Some(table.into()),
            },
            dtype,
        )
    }

    pub fn param(name: impl Into<String>, dtype: DataType) -> Self {
        Self::new(Op::ScalarParameter { name: name.into() }, dtype)
    }

    pub fn table(name: impl Into<String>, schema: Schema) -> Self {
        let dtype = DataType::Struct(schema.fields.clone());
        Self::new(
            Op::TableScan {
                name: name.into(),
                schema,
            },
            dtype,
        )
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Binary operation; comparisons and logic yield booleans, division floats,
    /// everything else the left operand's type
    pub fn binary(self, op: BinaryOp, right: Expr) -> Self {
        let dtype = if op.is_comparison() || op.is_logical() {
            DataType::Bool
        } else if op == BinaryOp::Divide {
            DataType::Float64
        } else if op == BinaryOp::FloorDivide {
            DataType::Int64
        } else {
            self.dtype.clone()
        };
        Self::new(
            Op::Binary {
                op,
                left: Box::new(self),
                right: Box::new(right),
            },
            dtype,
        )
    }

    pub fn call(func: Func, args: Vec<Expr>, dtype: DataType) -> Self {
        Self::new(Op::Call { func, args }, dtype)
    }

    pub fn is_null(self) -> Self {
        Self::call(Func::IsNull, vec![self], DataType::Bool)
    }

    pub fn not_null(self) -> Self {
        Self::call(Func::NotNull, vec![self], DataType::Bool)
    }

    pub fn not(self) -> Self {
        Self::call(Func::Not, vec![self], DataType::Bool)
    }

    pub fn equals(self, other: Expr) -> Self {
        self.binary(BinaryOp::Equals, other)
    }

    pub fn and(self, other: Expr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: Expr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    pub fn divide(self, other: Expr) -> Self {
        self.binary(BinaryOp::Divide, other)
    }

    pub fn floor(self) -> Self {
        let dtype = match &self.dtype {
            DataType::Decimal { .. } => self.dtype.clone(),
            _ => DataType::Int64,
        };
        Self::call(Func::Floor, vec![self], dtype)
    }

    /// Logarithm; natural when `base` is `None`
    pub fn log(self, base: Option<Expr>) -> Self {
        let mut args = vec![self];
        args.extend(base);
        Self::call(Func::Log, args, DataType::Float64)
    }

    pub fn cast(self, to: DataType) -> Self {
        Self::new(Op::Cast { arg: Box::new(self) }, to)
    }

    pub fn strftime(self, format: &str) -> Self {
        Self::new(
            Op::Strftime {
                arg: Box::new(self),
                format: Box::new(Expr::literal(format, DataType::String)),
            },
            DataType::String,
        )
    }

    /// `CASE WHEN cond THEN then ELSE otherwise END`, typed as `then`
    pub fn if_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        let dtype = then.dtype.clone();
        Self::new(
            Op::IfElse {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            dtype,
        )
    }

    pub fn reduction(func: Agg, args: Vec<Expr>, filter: Option<Expr>, dtype: DataType) -> Self {
        Self::new(
            Op::Reduction {
                func,
                args,
                filter: filter.map(Box::new),
            },
            dtype,
        )
    }

    pub fn union(self, other: Expr, distinct: bool) -> Self {
        self.set_op(crate::SetOpKind::Union, other, distinct)
    }

    pub fn set_op(self, kind: crate::SetOpKind, other: Expr, distinct: bool) -> Self {
        let dtype = self.dtype.clone();
        Self::new(
            Op::SetOp {
                kind,
                left: Box::new(self),
                right: Box::new(other),
                distinct,
            },
            dtype,
        )
    }
}
