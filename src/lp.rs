//! A backend-neutral linear program.
//!
//! Problems are built row by row, in the same way as for HiGHS' `RowProblem`, but without
//! depending on any particular solver. Solver backends translate a [`LinearProgram`] into their
//! own representation (see [`crate::solver`]).
use indexmap::IndexMap;

/// A decision variable in a [`LinearProgram`].
///
/// This does **not** include the value of the variable; it just refers to a column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    /// The column index of the variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// A column of the problem: an objective coefficient plus bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Objective coefficient
    pub cost: f64,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
}

/// A constraint of the form `lower <= sum(coeff * var) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
    /// Non-zero coefficients, at most one per variable
    pub terms: Vec<(Var, f64)>,
}

impl Row {
    /// Whether the row is an equality constraint
    pub fn is_equality(&self) -> bool {
        self.lower == self.upper
    }
}

/// A linear program to be minimised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl LinearProgram {
    /// Add a variable with the given objective coefficient and bounds
    pub fn add_column(&mut self, cost: f64, lower: f64, upper: f64) -> Var {
        debug_assert!(lower <= upper, "Bad bounds for column: [{lower}, {upper}]");
        self.columns.push(Column { cost, lower, upper });
        Var(self.columns.len() - 1)
    }

    /// Add a constraint, returning its row index.
    ///
    /// Repeated variables have their coefficients summed.
    pub fn add_row<I>(&mut self, lower: f64, upper: f64, terms: I) -> usize
    where
        I: IntoIterator<Item = (Var, f64)>,
    {
        let mut merged: IndexMap<Var, f64> = IndexMap::new();
        for (var, coeff) in terms {
            assert!(var.0 < self.columns.len(), "Unknown variable in constraint");
            *merged.entry(var).or_default() += coeff;
        }

        self.rows.push(Row {
            lower,
            upper,
            terms: merged.into_iter().filter(|(_, coeff)| *coeff != 0.0).collect(),
        });
        self.rows.len() - 1
    }

    /// Add an equality constraint `sum(coeff * var) == rhs`
    pub fn add_equality<I>(&mut self, rhs: f64, terms: I) -> usize
    where
        I: IntoIterator<Item = (Var, f64)>,
    {
        self.add_row(rhs, rhs, terms)
    }

    /// Add a term to an existing row
    pub fn add_term(&mut self, row: usize, var: Var, coeff: f64) {
        let row = &mut self.rows[row];
        if let Some((_, existing)) = row.terms.iter_mut().find(|(v, _)| *v == var) {
            *existing += coeff;
        } else {
            row.terms.push((var, coeff));
        }
    }

    /// The number of variables
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// The number of constraints
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The number of non-zero coefficients in the constraint matrix
    pub fn num_nonzeros(&self) -> usize {
        self.rows.iter().map(|row| row.terms.len()).sum()
    }

    /// The variables
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The constraints
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Evaluate the objective for the given variable values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(col, value)| col.cost * value)
            .sum()
    }

    /// Evaluate the left-hand side of `row` for the given variable values
    pub fn row_activity(&self, row: usize, values: &[f64]) -> f64 {
        self.rows[row]
            .terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.0])
            .sum()
    }
}
